//! Target database settings and connection-string rendering.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::{ConfigError, required};

const DEFAULT_DRIVER: &str = "ODBC Driver 18 for SQL Server";
const DEFAULT_PORT: u16 = 1433;

/// Connection details of the database being introspected.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DB")]
pub struct DatabaseSettings {
    /// Server host name.
    pub server: Option<String>,
    /// Database name.
    pub name: Option<String>,
    /// ODBC driver name.
    pub driver: Option<String>,
    /// Login user.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// TCP port.
    pub port: Option<u16>,
}

impl DatabaseSettings {
    /// Database name, required by every stage prompt.
    pub fn database_name(&self) -> Result<&str, ConfigError> {
        required(self.name.as_deref(), "DB_NAME")
    }

    /// Configured driver, falling back to the SQL Server ODBC 18 driver.
    #[must_use]
    pub fn driver(&self) -> &str {
        self.driver
            .as_deref()
            .filter(|driver| !driver.trim().is_empty())
            .unwrap_or(DEFAULT_DRIVER)
    }

    /// Configured port, falling back to 1433.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Connection string for the configured database.
    ///
    /// The tool server expects the string without a driver clause.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_pipeline::config::DatabaseSettings;
    ///
    /// let settings = DatabaseSettings {
    ///     server: Some("db.example".into()),
    ///     name: Some("Sales".into()),
    ///     driver: None,
    ///     user: Some("reader".into()),
    ///     password: Some("secret".into()),
    ///     port: None,
    /// };
    /// assert_eq!(
    ///     settings.connection_string(false).expect("complete settings"),
    ///     "SERVER=tcp:db.example,1433;DATABASE=Sales;Encrypt=yes;\
    ///      TrustServerCertificate=yes;Connection Timeout=30;UID=reader;PWD=secret;",
    /// );
    /// ```
    pub fn connection_string(&self, include_driver: bool) -> Result<String, ConfigError> {
        self.render(self.database_name()?, include_driver)
    }

    fn render(&self, database: &str, include_driver: bool) -> Result<String, ConfigError> {
        let server = required(self.server.as_deref(), "DB_SERVER")?;
        let user = required(self.user.as_deref(), "DB_USER")?;
        let password = required(self.password.as_deref(), "DB_PASSWORD")?;

        let mut parts = Vec::with_capacity(8);
        if include_driver {
            parts.push(format!("DRIVER={{{}}}", self.driver()));
        }
        parts.push(format!("SERVER=tcp:{server},{}", self.port()));
        parts.push(format!("DATABASE={database}"));
        parts.push("Encrypt=yes".to_owned());
        parts.push("TrustServerCertificate=yes".to_owned());
        parts.push("Connection Timeout=30".to_owned());
        parts.push(format!("UID={user}"));
        parts.push(format!("PWD={password}"));
        Ok(format!("{};", parts.join(";")))
    }
}
