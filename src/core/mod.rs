// Core algorithm exports
pub mod candidates;
pub mod comparator;
pub mod matcher;
pub mod normalize;

pub use candidates::{BlockingField, BlockingKey, BlockingKeyError, CandidateStrategy};
pub use comparator::{compare_records, FieldMatches};
pub use matcher::{DetectionOutcome, Matcher};
pub use normalize::{equals_normalized, normalize_alpha_num, normalize_basic, normalize_email, NormalizationConfig, Normalizer};
