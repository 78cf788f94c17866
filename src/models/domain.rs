use serde::{Deserialize, Serialize};

/// Contact row as extracted from an uploaded sheet
///
/// A record without `id` is kept in the sequence but never compared.
/// `zip_code` defaults to 0 when the cell was missing or unparseable,
/// and 0 compares equal to 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "zipCode", default)]
    pub zip_code: i32,
    #[serde(default)]
    pub address: Option<String>,
}

impl ContactRecord {
    /// A record takes part in comparison only when it carries an identifier
    pub fn is_usable(&self) -> bool {
        self.id.is_some()
    }
}

/// Outcome of comparing one field of two records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFlag {
    Matched,
    NotMatched,
}

impl MatchFlag {
    pub fn is_matched(self) -> bool {
        matches!(self, MatchFlag::Matched)
    }
}

impl From<bool> for MatchFlag {
    fn from(matched: bool) -> Self {
        if matched {
            MatchFlag::Matched
        } else {
            MatchFlag::NotMatched
        }
    }
}

/// A scored candidate duplicate pair
///
/// `precision` is the number of `Matched` flags, 1 to 5 for every
/// result the matcher emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "sourceId")]
    pub source_id: i64,
    #[serde(rename = "targetId")]
    pub target_id: i64,
    pub precision: u8,
    #[serde(rename = "name")]
    pub first_name: MatchFlag,
    #[serde(rename = "name1")]
    pub last_name: MatchFlag,
    pub email: MatchFlag,
    #[serde(rename = "postalZip")]
    pub zip_code: MatchFlag,
    pub address: MatchFlag,
}

impl MatchResult {
    /// Flags in report column order: name, name1, email, postalZip, address
    pub fn flags(&self) -> [MatchFlag; 5] {
        [
            self.first_name,
            self.last_name,
            self.email,
            self.zip_code,
            self.address,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_usability() {
        let record = ContactRecord::default();
        assert!(!record.is_usable());

        let record = ContactRecord {
            id: Some(7),
            ..Default::default()
        };
        assert!(record.is_usable());
    }

    #[test]
    fn test_match_result_serializes_report_names() {
        let result = MatchResult {
            source_id: 1,
            target_id: 2,
            precision: 1,
            first_name: MatchFlag::Matched,
            last_name: MatchFlag::NotMatched,
            email: MatchFlag::NotMatched,
            zip_code: MatchFlag::NotMatched,
            address: MatchFlag::NotMatched,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["sourceId"], 1);
        assert_eq!(json["name"], "matched");
        assert_eq!(json["postalZip"], "not_matched");
    }
}
