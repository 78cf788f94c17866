// Service exports
pub mod report;
pub mod spreadsheet;

pub use report::{write_matches, ReportError, ReportLayout, MAX_REPORT_ROWS, REPORT_HEADERS};
pub use spreadsheet::{read_contacts, SheetContents, SpreadsheetError};
