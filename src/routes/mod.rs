// Route exports
pub mod excel;

use actix_web::web;

pub use excel::{handle_query_payload_error, AppState, UploadError};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(excel::configure),
    );
}
