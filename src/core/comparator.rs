use crate::core::normalize::Normalizer;
use crate::models::{ContactRecord, MatchResult};

/// Per-field match vector for one record pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMatches {
    pub first_name: bool,
    pub last_name: bool,
    pub email: bool,
    pub zip_code: bool,
    pub address: bool,
}

impl FieldMatches {
    /// Number of matching fields (0-5)
    #[inline]
    pub fn precision(&self) -> u8 {
        self.as_array().iter().filter(|matched| **matched).count() as u8
    }

    pub fn as_array(&self) -> [bool; 5] {
        [
            self.first_name,
            self.last_name,
            self.email,
            self.zip_code,
            self.address,
        ]
    }

    /// Build the reported pair; `None` when no field matched
    pub fn into_result(self, source_id: i64, target_id: i64) -> Option<MatchResult> {
        let precision = self.precision();
        if precision == 0 {
            return None;
        }

        Some(MatchResult {
            source_id,
            target_id,
            precision,
            first_name: self.first_name.into(),
            last_name: self.last_name.into(),
            email: self.email.into(),
            zip_code: self.zip_code.into(),
            address: self.address.into(),
        })
    }
}

/// Compare two usable records field by field
///
/// Every field is evaluated independently and carries the same weight.
/// Zip codes use plain integer equality.
#[inline]
pub fn compare_records(
    source: &ContactRecord,
    target: &ContactRecord,
    normalizer: &Normalizer,
) -> FieldMatches {
    FieldMatches {
        first_name: normalizer.text_eq(source.first_name.as_deref(), target.first_name.as_deref()),
        last_name: normalizer.text_eq(source.last_name.as_deref(), target.last_name.as_deref()),
        email: normalizer.email_eq(source.email.as_deref(), target.email.as_deref()),
        zip_code: source.zip_code == target.zip_code,
        address: normalizer.text_eq(source.address.as_deref(), target.address.as_deref()),
    }
}
