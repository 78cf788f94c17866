use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::models::{MatchFlag, MatchResult};

/// Errors that can occur while rendering the match report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report workbook: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("Report has {matches} matches, a worksheet holds at most {max}")]
    TooManyRows { matches: usize, max: usize },
}

/// Matches that fit below the header row of one xlsx worksheet
pub const MAX_REPORT_ROWS: usize = 1_048_575;

fn ensure_fits(matches: usize) -> Result<(), ReportError> {
    if matches > MAX_REPORT_ROWS {
        return Err(ReportError::TooManyRows {
            matches,
            max: MAX_REPORT_ROWS,
        });
    }
    Ok(())
}

/// Report columns in output order
pub const REPORT_HEADERS: [&str; 8] = [
    "sourceId",
    "targetId",
    "precision",
    "name",
    "name1",
    "email",
    "postalZip",
    "address",
];

/// Sheet name and flag labels of the generated report
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub sheet_name: String,
    pub matched_label: String,
    pub not_matched_label: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            sheet_name: "matches".to_string(),
            matched_label: "SI".to_string(),
            not_matched_label: "NO".to_string(),
        }
    }
}

impl ReportLayout {
    pub fn label(&self, flag: MatchFlag) -> &str {
        match flag {
            MatchFlag::Matched => &self.matched_label,
            MatchFlag::NotMatched => &self.not_matched_label,
        }
    }
}

/// Render match results as an xlsx workbook, one row per pair
///
/// Fails with [`ReportError::TooManyRows`] past [`MAX_REPORT_ROWS`] matches,
/// before anything is written.
pub fn write_matches(matches: &[MatchResult], layout: &ReportLayout) -> Result<Vec<u8>, ReportError> {
    ensure_fits(matches.len())?;

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&layout.sheet_name)?;

    for (col, title) in REPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (idx, m) in matches.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_string(row, 0, m.source_id.to_string())?;
        worksheet.write_string(row, 1, m.target_id.to_string())?;
        worksheet.write_number(row, 2, m.precision)?;

        for (offset, flag) in m.flags().iter().enumerate() {
            worksheet.write_string(row, 3 + offset as u16, layout.label(*flag))?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_labels() {
        let layout = ReportLayout::default();
        assert_eq!(layout.sheet_name, "matches");
        assert_eq!(layout.label(MatchFlag::Matched), "SI");
        assert_eq!(layout.label(MatchFlag::NotMatched), "NO");
    }

    #[test]
    fn test_write_empty_report() {
        let bytes = write_matches(&[], &ReportLayout::default()).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_invalid_sheet_name_is_an_error() {
        let layout = ReportLayout {
            sheet_name: "bad/name".to_string(),
            ..Default::default()
        };
        assert!(write_matches(&[], &layout).is_err());
    }

    #[test]
    fn test_row_capacity() {
        assert!(ensure_fits(MAX_REPORT_ROWS).is_ok());
        assert!(matches!(
            ensure_fits(MAX_REPORT_ROWS + 1),
            Err(ReportError::TooManyRows { matches, max }) if matches == MAX_REPORT_ROWS + 1 && max == MAX_REPORT_ROWS
        ));
    }
}
