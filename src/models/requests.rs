use serde::{Deserialize, Serialize};
use validator::Validate;

/// Strategy selector accepted on the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Exhaustive,
    Bucketed,
}

/// Query parameters of the upload endpoints
///
/// `sheet` selects the worksheet to read; blank means the first one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FindMatchesQuery {
    // Excel caps sheet names at 31 characters
    #[validate(length(max = 31))]
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
}

impl FindMatchesQuery {
    /// Sheet name with blank values treated as absent
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
