//! Turns loosely typed spreadsheet rows into [`Record`]s.
//!
//! Only comma-grouped numerals such as `1,000` are coerced into numbers.
//! Plain digit strings like `1000` stay text, because downstream tables
//! already rely on that column typing.

use crate::betpool::resync::model::{CellValue, RawRow, Record};

/// Normalises every row of a sheet.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<Record> {
    rows.iter().map(normalize_row).collect()
}

/// Trims every column name and cleans every cell. When two raw columns trim
/// to the same name, the one further right in the sheet wins.
pub fn normalize_row(row: &RawRow) -> Record {
    row.iter()
        .map(|(column, cell)| (column.trim().to_string(), normalize_cell(cell)))
        .collect()
}

/// Cleans a single cell. Never fails: anything that is not empty and not a
/// comma-grouped numeral is returned unchanged as text.
pub fn normalize_cell(cell: &str) -> CellValue {
    if cell.is_empty() {
        return CellValue::Null;
    }

    if looks_grouped_numeric(cell) {
        if let Ok(number) = cell.replace(',', "").parse::<f64>() {
            return CellValue::Number(number);
        }
    }

    CellValue::Text(cell.to_string())
}

/// Digits and commas with an optional leading minus, containing at least one
/// comma.
fn looks_grouped_numeric(cell: &str) -> bool {
    let body = cell.strip_prefix('-').unwrap_or(cell);
    !body.is_empty()
        && body.contains(',')
        && body.chars().all(|ch| ch.is_ascii_digit() || ch == ',')
}
