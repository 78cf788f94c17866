//! Contact Dedup - duplicate detection for uploaded contact spreadsheets
//!
//! The core compares contact records field by field after normalization and
//! reports every pair with at least one matching field, scored by how many
//! fields matched. Spreadsheet reading, report writing and the HTTP upload
//! endpoint are thin layers around it.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{CandidateStrategy, Matcher, NormalizationConfig, Normalizer};
pub use crate::models::{ContactRecord, MatchFlag, MatchResult};
