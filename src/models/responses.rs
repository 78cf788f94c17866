use serde::{Deserialize, Serialize};
use crate::models::domain::MatchResult;

/// Response for the JSON duplicate report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReportResponse {
    #[serde(rename = "reportId")]
    pub report_id: String,
    pub sheet: String,
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
    #[serde(rename = "usableRecords")]
    pub usable_records: usize,
    #[serde(rename = "comparedPairs")]
    pub compared_pairs: usize,
    pub matches: Vec<MatchResult>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
