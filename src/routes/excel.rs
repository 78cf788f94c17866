use actix_multipart::Multipart;
use actix_web::{error, http::header, http::StatusCode, web, HttpResponse, Responder};
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;
use validator::Validate;

use crate::config::{Settings, UploadSettings};
use crate::core::{BlockingKeyError, DetectionOutcome, Matcher, Normalizer};
use crate::models::{DuplicateReportResponse, ErrorResponse, FindMatchesQuery, HealthResponse, StrategyKind};
use crate::services::{read_contacts, write_matches, ReportError, SpreadsheetError};

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Multipart field carrying the uploaded workbook
const FILE_FIELD: &str = "file";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the default matcher; fails on invalid blocking keys
    pub fn new(settings: Settings) -> Result<Self, BlockingKeyError> {
        // Requests may switch to the bucketed strategy
        settings.matching.blocking_keys()?;

        let normalizer = Normalizer::new(settings.matching.normalization());
        let matcher = Matcher::new(normalizer, settings.matching.candidate_strategy()?);

        Ok(Self {
            matcher,
            settings: Arc::new(settings),
        })
    }

    fn matcher_for(&self, kind: Option<StrategyKind>) -> Result<Matcher, BlockingKeyError> {
        match kind {
            None => Ok(self.matcher.clone()),
            Some(kind) => Ok(self
                .matcher
                .with_strategy(self.settings.matching.strategy_for(kind)?)),
        }
    }
}

/// Request-level failures of the upload endpoints
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Multipart field 'file' is required")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),

    #[error("Upload exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed multipart payload: {0}")]
    Multipart(String),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Matching configuration error: {0}")]
    Configuration(#[from] BlockingKeyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    fn kind(&self) -> &'static str {
        match self {
            UploadError::MissingFile => "missing_file",
            UploadError::EmptyFile => "empty_file",
            UploadError::UnsupportedExtension(_) => "unsupported_file_type",
            UploadError::TooLarge(_) => "file_too_large",
            UploadError::InvalidQuery(_) => "invalid_query",
            UploadError::Multipart(_) => "invalid_multipart",
            UploadError::Spreadsheet(SpreadsheetError::SheetNotFound(_)) => "sheet_not_found",
            UploadError::Spreadsheet(_) => "invalid_workbook",
            UploadError::Report(ReportError::TooManyRows { .. }) => "report_too_large",
            UploadError::Report(_) => "report_failed",
            UploadError::Configuration(_) => "configuration_error",
            UploadError::Internal(_) => "internal_error",
        }
    }

    /// Server failures log at error, rejections of a malformed request at warn
    fn log_level(&self) -> Level {
        if error::ResponseError::status_code(self).is_server_error() {
            return Level::ERROR;
        }
        match self {
            UploadError::TooLarge(_)
            | UploadError::Multipart(_)
            | UploadError::Spreadsheet(SpreadsheetError::Open(_)) => Level::WARN,
            _ => Level::INFO,
        }
    }
}

impl error::ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Report(ReportError::TooManyRows { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::Report(_) | UploadError::Configuration(_) | UploadError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let level = self.log_level();
        if level == Level::ERROR {
            tracing::error!("Upload failed ({}): {}", self.kind(), self);
        } else if level == Level::WARN {
            tracing::warn!("Upload rejected ({}): {}", self.kind(), self);
        } else {
            tracing::info!("Upload rejected ({}): {}", self.kind(), self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// Handle query string errors (e.g. an unknown strategy)
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::debug!("Query error on {}", req.path());
    UploadError::InvalidQuery(err.to_string()).into()
}

/// Configure all spreadsheet routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/excel/find-matches", web::post().to(find_matches))
        .route("/excel/report", web::post().to(report_matches));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Uploaded workbook held in memory
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of the multipart stream
///
/// The extension is checked before the body is buffered and the size
/// limit is enforced while streaming.
async fn read_upload(mut payload: Multipart, limits: &UploadSettings) -> Result<Upload, UploadError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| UploadError::Multipart(e.to_string()))?;

        if field.name() != Some(FILE_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            }
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();

        if !limits.accepts_file_name(&file_name) {
            return Err(UploadError::UnsupportedExtension(file_name));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Multipart(e.to_string()))?;
            if bytes.len() + chunk.len() > limits.max_upload_bytes {
                return Err(UploadError::TooLarge(limits.max_upload_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(UploadError::EmptyFile);
        }

        return Ok(Upload { file_name, bytes });
    }

    Err(UploadError::MissingFile)
}

/// Read the selected sheet and run detection
fn detect_in_upload(
    upload: &Upload,
    sheet: Option<&str>,
    matcher: &Matcher,
) -> Result<(String, DetectionOutcome), UploadError> {
    let contents = read_contacts(&upload.bytes, sheet)?;
    let outcome = matcher.detect(&contents.records);
    Ok((contents.sheet_name, outcome))
}

async fn prepare(
    state: &AppState,
    query: &FindMatchesQuery,
    payload: Multipart,
) -> Result<(Upload, Matcher), UploadError> {
    if let Err(errors) = query.validate() {
        return Err(UploadError::InvalidQuery(errors.to_string()));
    }

    let upload = read_upload(payload, &state.settings.upload).await?;
    let matcher = state.matcher_for(query.strategy)?;
    Ok((upload, matcher))
}

/// Find matches endpoint
///
/// POST /api/v1/excel/find-matches?sheet={sheet}&strategy={exhaustive|bucketed}
///
/// Multipart body with a `file` field holding the workbook. Responds with
/// an xlsx download listing every pair with at least one matching field.
async fn find_matches(
    state: web::Data<AppState>,
    query: web::Query<FindMatchesQuery>,
    payload: Multipart,
) -> Result<HttpResponse, UploadError> {
    let query = query.into_inner();
    let (upload, matcher) = prepare(&state, &query, payload).await?;

    let sheet = query.sheet_name().map(str::to_string);
    let layout = state.settings.report.layout();
    let file_name = upload.file_name.clone();

    let (sheet_name, outcome, xlsx) = web::block(move || -> Result<_, UploadError> {
        let (sheet_name, outcome) = detect_in_upload(&upload, sheet.as_deref(), &matcher)?;
        let xlsx = write_matches(&outcome.matches, &layout)?;
        Ok((sheet_name, outcome, xlsx))
    })
    .await
    .map_err(|e| UploadError::Internal(e.to_string()))??;

    tracing::info!(
        "Processed '{}' sheet '{}': {} records, {} usable, {} pairs compared, {} matches",
        file_name,
        sheet_name,
        outcome.total_records,
        outcome.usable_records,
        outcome.compared_pairs,
        outcome.matches.len()
    );

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", state.settings.upload.download_file_name),
        ))
        .body(xlsx))
}

/// Duplicate report endpoint
///
/// POST /api/v1/excel/report?sheet={sheet}&strategy={exhaustive|bucketed}
///
/// Same input as `find-matches`; responds with the matches and counters as JSON.
async fn report_matches(
    state: web::Data<AppState>,
    query: web::Query<FindMatchesQuery>,
    payload: Multipart,
) -> Result<HttpResponse, UploadError> {
    let query = query.into_inner();
    let (upload, matcher) = prepare(&state, &query, payload).await?;

    let sheet = query.sheet_name().map(str::to_string);
    let file_name = upload.file_name.clone();

    let (sheet_name, outcome) = web::block(move || detect_in_upload(&upload, sheet.as_deref(), &matcher))
        .await
        .map_err(|e| UploadError::Internal(e.to_string()))??;

    let response = DuplicateReportResponse {
        report_id: uuid::Uuid::new_v4().to_string(),
        sheet: sheet_name,
        total_records: outcome.total_records,
        usable_records: outcome.usable_records,
        compared_pairs: outcome.compared_pairs,
        matches: outcome.matches,
    };

    tracing::info!(
        "Report {} for '{}': {} matches from {} usable records",
        response.report_id,
        file_name,
        response.matches.len(),
        response.usable_records
    );

    Ok(HttpResponse::Ok().json(response))
}
