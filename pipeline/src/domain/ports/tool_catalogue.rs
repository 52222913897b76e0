//! Driven port describing the tools exposed by the schema tool server.

/// Port listing the tool names agents may call.
#[cfg_attr(test, mockall::automock)]
pub trait ToolCatalogue: Send + Sync {
    /// Tool names in the order they should be presented to agents.
    fn list_tools(&self) -> Vec<String>;
}

/// Fixture catalogue that advertises no tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureToolCatalogue;

impl ToolCatalogue for FixtureToolCatalogue {
    fn list_tools(&self) -> Vec<String> {
        Vec::new()
    }
}
