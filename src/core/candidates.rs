use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::normalize::{normalize_alpha_num, normalize_basic, normalize_email};
use crate::models::ContactRecord;

/// Errors raised while parsing a blocking key definition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockingKeyError {
    #[error("Unknown blocking field: {0}")]
    UnknownField(String),

    #[error("Blocking key must name at least one field")]
    Empty,
}

/// Record field usable as (part of) a blocking key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockingField {
    FirstName,
    LastName,
    Email,
    ZipCode,
    Address,
}

impl BlockingField {
    fn key_part(self, record: &ContactRecord) -> String {
        let text = |value: &Option<String>| value.as_deref().unwrap_or("").to_string();

        match self {
            BlockingField::FirstName => normalize_basic(&text(&record.first_name)),
            BlockingField::LastName => normalize_basic(&text(&record.last_name)),
            BlockingField::Email => normalize_email(&text(&record.email)),
            BlockingField::ZipCode => record.zip_code.to_string(),
            BlockingField::Address => normalize_alpha_num(&text(&record.address)),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            BlockingField::FirstName => "first_name",
            BlockingField::LastName => "last_name",
            BlockingField::Email => "email",
            BlockingField::ZipCode => "zip_code",
            BlockingField::Address => "address",
        }
    }
}

impl FromStr for BlockingField {
    type Err = BlockingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_name" | "name" => Ok(BlockingField::FirstName),
            "last_name" | "name1" => Ok(BlockingField::LastName),
            "email" => Ok(BlockingField::Email),
            "zip_code" | "postalzip" => Ok(BlockingField::ZipCode),
            "address" => Ok(BlockingField::Address),
            other => Err(BlockingKeyError::UnknownField(other.to_string())),
        }
    }
}

/// One blocking pass: a single field or a `+`-joined composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingKey {
    fields: Vec<BlockingField>,
}

impl BlockingKey {
    pub fn new(fields: Vec<BlockingField>) -> Result<Self, BlockingKeyError> {
        if fields.is_empty() {
            return Err(BlockingKeyError::Empty);
        }
        Ok(Self { fields })
    }

    pub fn single(field: BlockingField) -> Self {
        Self { fields: vec![field] }
    }

    pub fn fields(&self) -> &[BlockingField] {
        &self.fields
    }

    /// Bucket key for a record; `None` when any part normalizes to empty
    pub fn derive(&self, record: &ContactRecord) -> Option<String> {
        let mut parts = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let part = field.key_part(record);
            if part.is_empty() {
                return None;
            }
            parts.push(part);
        }
        Some(parts.join("|"))
    }
}

impl FromStr for BlockingKey {
    type Err = BlockingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split('+')
            .filter(|part| !part.trim().is_empty())
            .map(BlockingField::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(fields)
    }
}

impl fmt::Display for BlockingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.as_str()).collect();
        write!(f, "{}", names.join("+"))
    }
}

/// How candidate pairs are selected
///
/// `Exhaustive` compares every pair and is the correctness baseline.
/// `Bucketed` only compares records sharing a blocking key. Records whose
/// key is empty for every pass are never compared, so duplicates that
/// disagree on all configured keys are missed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CandidateStrategy {
    #[default]
    Exhaustive,
    Bucketed(Vec<BlockingKey>),
}

impl CandidateStrategy {
    /// Index pairs `(i, j)` with `i < j` over `records`, without repeats
    ///
    /// Exhaustive pairs come in index order. Bucketed pairs come per pass,
    /// per bucket in order of first appearance, then in index order.
    pub fn candidate_pairs<'a>(
        &'a self,
        records: &[&ContactRecord],
    ) -> Box<dyn Iterator<Item = (usize, usize)> + 'a> {
        match self {
            CandidateStrategy::Exhaustive => Box::new(exhaustive_pairs(records.len())),
            CandidateStrategy::Bucketed(keys) => Box::new(bucketed_pairs(records, keys).into_iter()),
        }
    }
}

/// All `n * (n - 1) / 2` pairs in index order
pub fn exhaustive_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j)))
}

/// Group record indices by blocking key, keeping first-appearance order
pub fn build_buckets(records: &[&ContactRecord], key: &BlockingKey) -> Vec<Vec<usize>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let Some(bucket_key) = key.derive(record) else {
            continue;
        };

        let slot = *positions.entry(bucket_key).or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(idx);
    }

    buckets
}

/// Pairs from every blocking pass, deduplicated on `(min, max)`
pub fn bucketed_pairs(records: &[&ContactRecord], keys: &[BlockingKey]) -> Vec<(usize, usize)> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut pairs = Vec::new();

    for key in keys {
        let buckets = build_buckets(records, key);
        tracing::debug!(
            "Blocking on {}: {} buckets over {} records",
            key,
            buckets.len(),
            records.len()
        );

        for idxs in buckets.iter().filter(|idxs| idxs.len() >= 2) {
            for (a, &i) in idxs.iter().enumerate() {
                for &j in &idxs[a + 1..] {
                    let pair = (i.min(j), i.max(j));
                    if seen.insert(pair) {
                        pairs.push(pair);
                    }
                }
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(id: i64, first: &str, last: &str) -> ContactRecord {
        ContactRecord {
            id: Some(id),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_exhaustive_pairs_order() {
        let pairs: Vec<_> = exhaustive_pairs(4).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_small_inputs_have_no_pairs() {
        assert_eq!(exhaustive_pairs(0).count(), 0);
        assert_eq!(exhaustive_pairs(1).count(), 0);

        let one = named(1, "a", "b");
        let key = BlockingKey::single(BlockingField::LastName);
        assert!(bucketed_pairs(&[&one], &[key]).is_empty());
    }

    #[test]
    fn test_parse_blocking_keys() {
        let key: BlockingKey = "last_name".parse().unwrap();
        assert_eq!(key.fields(), &[BlockingField::LastName]);

        let key: BlockingKey = "zip_code + address".parse().unwrap();
        assert_eq!(key.fields(), &[BlockingField::ZipCode, BlockingField::Address]);
        assert_eq!(key.to_string(), "zip_code+address");

        assert_eq!(
            "phone".parse::<BlockingKey>(),
            Err(BlockingKeyError::UnknownField("phone".to_string()))
        );
        assert_eq!("".parse::<BlockingKey>(), Err(BlockingKeyError::Empty));
    }

    #[test]
    fn test_buckets_follow_first_appearance() {
        let records = [
            named(1, "a", "Ng"),
            named(2, "b", "Li"),
            named(3, "c", "ng"),
            named(4, "d", ""),
            named(5, "e", "LI"),
        ];
        let refs: Vec<&ContactRecord> = records.iter().collect();

        let buckets = build_buckets(&refs, &BlockingKey::single(BlockingField::LastName));
        assert_eq!(buckets, vec![vec![0, 2], vec![1, 4]]);
    }

    #[test]
    fn test_composite_key_requires_all_parts() {
        let record = ContactRecord {
            id: Some(1),
            last_name: Some("Li".to_string()),
            ..Default::default()
        };
        let key: BlockingKey = "last_name+first_name".parse().unwrap();
        assert_eq!(key.derive(&record), None);

        let key: BlockingKey = "last_name+zip_code".parse().unwrap();
        assert_eq!(key.derive(&record), Some("li|0".to_string()));
    }

    #[test]
    fn test_multi_pass_pairs_are_deduplicated() {
        let records = [
            named(1, "Ana", "Li"),
            named(2, "Ana", "Li"),
            named(3, "Ana", "Ng"),
        ];
        let refs: Vec<&ContactRecord> = records.iter().collect();
        let keys = vec![
            BlockingKey::single(BlockingField::LastName),
            BlockingKey::single(BlockingField::FirstName),
        ];

        let pairs = bucketed_pairs(&refs, &keys);
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_empty_key_records_are_never_paired() {
        let records = [named(1, "Ana", ""), named(2, "Ana", "")];
        let refs: Vec<&ContactRecord> = records.iter().collect();
        let strategy = CandidateStrategy::Bucketed(vec![BlockingKey::single(BlockingField::LastName)]);

        assert_eq!(strategy.candidate_pairs(&refs).count(), 0);
        assert_eq!(CandidateStrategy::Exhaustive.candidate_pairs(&refs).count(), 1);
    }
}
