//! Classification of entity files into consolidated document sections.

/// Section of the consolidated document a file contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// `*relationships.json` files.
    ForeignKeys,
    /// `*schema.json` files.
    Columns,
    /// The `tables.json` inventory.
    Tables,
}

impl Bucket {
    /// Classify a file name, ignoring case. Returns `None` for files that
    /// belong to no section.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_pipeline::domain::Bucket;
    ///
    /// assert_eq!(Bucket::classify("Orders_Relationships.json"), Some(Bucket::ForeignKeys));
    /// assert_eq!(Bucket::classify("Orders_schema.json"), Some(Bucket::Columns));
    /// assert_eq!(Bucket::classify("TABLES.json"), Some(Bucket::Tables));
    /// assert_eq!(Bucket::classify("my_tables.json"), None);
    /// ```
    #[must_use]
    pub fn classify(file_name: &str) -> Option<Self> {
        let lowered = file_name.to_lowercase();
        if lowered.ends_with("relationships.json") {
            Some(Self::ForeignKeys)
        } else if lowered.ends_with("schema.json") {
            Some(Self::Columns)
        } else if lowered == "tables.json" {
            Some(Self::Tables)
        } else {
            None
        }
    }
}
