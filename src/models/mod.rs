// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{ContactRecord, MatchFlag, MatchResult};
pub use requests::{FindMatchesQuery, StrategyKind};
pub use responses::{DuplicateReportResponse, HealthResponse, ErrorResponse};
