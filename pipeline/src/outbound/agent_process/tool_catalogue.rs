//! Tool catalogue backed by configuration.

use crate::domain::ports::ToolCatalogue;

/// Catalogue advertising a fixed, configured list of tool names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticToolCatalogue {
    tools: Vec<String>,
}

impl StaticToolCatalogue {
    /// Advertise `tools`, skipping blank names.
    #[must_use]
    pub fn new(tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tools: tools
                .into_iter()
                .map(Into::into)
                .filter(|tool| !tool.trim().is_empty())
                .collect(),
        }
    }
}

impl ToolCatalogue for StaticToolCatalogue {
    fn list_tools(&self) -> Vec<String> {
        self.tools.clone()
    }
}
