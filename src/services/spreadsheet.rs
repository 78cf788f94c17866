use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use chrono::NaiveTime;
use std::collections::HashMap;
use std::io::Cursor;
use thiserror::Error;

use crate::models::ContactRecord;

/// Errors that can occur while reading an uploaded workbook
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Failed to open workbook: {0}")]
    Open(#[from] calamine::Error),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },
}

/// Column headers recognized in the header row (compared lower-cased)
pub mod headers {
    pub const CONTACT_ID: &str = "contactid";
    pub const FIRST_NAME: &str = "name";
    pub const LAST_NAME: &str = "name1";
    pub const EMAIL: &str = "email";
    pub const POSTAL_ZIP: &str = "postalzip";
    pub const ADDRESS: &str = "address";
}

/// Records read from one worksheet, in row order
#[derive(Debug, Clone, Default)]
pub struct SheetContents {
    pub sheet_name: String,
    pub records: Vec<ContactRecord>,
}

/// Header name to column index mapping for the expected contact columns
#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    contact_id: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    email: Option<usize>,
    postal_zip: Option<usize>,
    address: Option<usize>,
}

impl ColumnMap {
    fn from_header(row: &[Data]) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (col, cell) in row.iter().enumerate() {
            let key = cell_text(cell).to_lowercase();
            if !key.is_empty() {
                // Later duplicates win, like a plain map insert
                index.insert(key, col);
            }
        }

        Self {
            contact_id: index.get(headers::CONTACT_ID).copied(),
            first_name: index.get(headers::FIRST_NAME).copied(),
            last_name: index.get(headers::LAST_NAME).copied(),
            email: index.get(headers::EMAIL).copied(),
            postal_zip: index.get(headers::POSTAL_ZIP).copied(),
            address: index.get(headers::ADDRESS).copied(),
        }
    }

    fn record(&self, row: &[Data]) -> ContactRecord {
        let cell = |col: Option<usize>| col.and_then(|c| row.get(c));
        let text = |col: Option<usize>| col.map(|c| row.get(c).map(cell_text).unwrap_or_default());

        ContactRecord {
            id: cell(self.contact_id).and_then(cell_id),
            first_name: text(self.first_name),
            last_name: text(self.last_name),
            email: text(self.email),
            zip_code: cell(self.postal_zip).map(cell_zip).unwrap_or(0),
            address: text(self.address),
        }
    }
}

/// Read contact records from workbook bytes (xlsx, xls or ods)
///
/// `sheet` selects a worksheet by name; `None` reads the first one. An
/// empty workbook or sheet yields no records. Cells that fail to parse
/// degrade to absent values instead of failing the read.
pub fn read_contacts(bytes: &[u8], sheet: Option<&str>) -> Result<SheetContents, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|candidate| candidate.as_str() == name)
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFound(name.to_string()))?,
        None => match sheet_names.first() {
            Some(first) => first.clone(),
            None => return Ok(SheetContents::default()),
        },
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SpreadsheetError::Sheet {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

    let records = records_from_range(&range);
    tracing::debug!("Read {} rows from sheet '{}'", records.len(), sheet_name);

    Ok(SheetContents { sheet_name, records })
}

/// Convert a used range into records: first row is the header
pub fn records_from_range(range: &Range<Data>) -> Vec<ContactRecord> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Vec::new();
    };

    let columns = ColumnMap::from_header(header);
    let (height, _) = range.get_size();
    let mut out = Vec::with_capacity(height.saturating_sub(1));

    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        out.push(columns.record(row));
    }

    out
}

/// Visible text of a cell, trimmed
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(n) => {
            // Integers without decimals, the way a sheet displays them
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(dt) => date_text(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

/// Dates as ISO text, with the time only when it is not midnight
fn date_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return format!("{}", dt.as_f64());
    }
    match dt.as_datetime() {
        Some(value) if value.time() == NaiveTime::MIN => value.format("%Y-%m-%d").to_string(),
        Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}", dt.as_f64()),
    }
}

/// Contact identifier: parsed text first, then a truncated numeric value
fn cell_id(cell: &Data) -> Option<i64> {
    parse_long_safe(&cell_text(cell)).or(match cell {
        Data::Int(n) => Some(*n),
        Data::Float(n) if n.is_finite() => Some(n.trunc() as i64),
        _ => None,
    })
}

/// Zip code: digits and dashes only, 0 when unparseable
fn cell_zip(cell: &Data) -> i32 {
    let digits: String = cell_text(cell)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    parse_int_safe(&digits)
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

/// Parse an i64 ignoring thousands separators and whitespace
pub fn parse_long_safe(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    strip_separators(s).parse().ok()
}

/// Parse an i32 ignoring thousands separators and whitespace, 0 on failure
pub fn parse_int_safe(s: &str) -> i32 {
    if s.is_empty() {
        return 0;
    }
    strip_separators(s).parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::ExcelDateTimeType;

    #[test]
    fn test_parse_long_safe() {
        assert_eq!(parse_long_safe("1,234"), Some(1234));
        assert_eq!(parse_long_safe(" 42 "), Some(42));
        assert_eq!(parse_long_safe("12.5"), None);
        assert_eq!(parse_long_safe("abc"), None);
        assert_eq!(parse_long_safe(""), None);
    }

    #[test]
    fn test_parse_int_safe() {
        assert_eq!(parse_int_safe("90210"), 90210);
        assert_eq!(parse_int_safe("90210-1234"), 0);
        assert_eq!(parse_int_safe(""), 0);
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Float(1234.0)), "1234");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::String("  Ana ".to_string())), "Ana");
        assert_eq!(cell_text(&Data::Bool(true)), "TRUE");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_cell_text_dates() {
        let date = Data::DateTime(ExcelDateTime::new(45123.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&date), "2023-07-16");

        let date_time = ExcelDateTime::new(45123.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_text(&Data::DateTime(date_time)), "2023-07-16 12:00:00");

        // Dates never leak into zip codes as serial digits
        assert_eq!(cell_zip(&date), 0);
    }

    #[test]
    fn test_cell_id_falls_back_to_truncation() {
        assert_eq!(cell_id(&Data::Float(17.9)), Some(17));
        assert_eq!(cell_id(&Data::Int(5)), Some(5));
        assert_eq!(cell_id(&Data::String("x-1".to_string())), None);
        assert_eq!(cell_id(&Data::Empty), None);
    }

    #[test]
    fn test_cell_zip() {
        assert_eq!(cell_zip(&Data::String("CP 01234".to_string())), 1234);
        assert_eq!(cell_zip(&Data::Float(90210.0)), 90210);
        assert_eq!(cell_zip(&Data::String("n/a".to_string())), 0);
    }

    #[test]
    fn test_records_from_range() {
        let mut range: Range<Data> = Range::new((0, 0), (3, 3));
        range.set_value((0, 0), Data::String("ContactId".to_string()));
        range.set_value((0, 1), Data::String(" NAME ".to_string()));
        range.set_value((0, 2), Data::String("PostalZip".to_string()));
        range.set_value((0, 3), Data::String("unused".to_string()));
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::String("Ana".to_string()));
        range.set_value((1, 2), Data::String("100".to_string()));
        // row 2 left empty
        range.set_value((3, 1), Data::String("No id".to_string()));

        let records = records_from_range(&range);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].id, Some(1));
        assert_eq!(records[0].first_name.as_deref(), Some("Ana"));
        assert_eq!(records[0].zip_code, 100);
        assert_eq!(records[0].email, None);

        assert_eq!(records[1].id, None);
        assert_eq!(records[1].zip_code, 0);
    }
}
