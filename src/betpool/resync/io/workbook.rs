use std::collections::HashMap;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::{debug, instrument, warn};

use crate::betpool::resync::error::{Result, ResyncError};
use crate::betpool::resync::io::sheets::SheetSource;
use crate::betpool::resync::model::RawRow;

/// Spreadsheet source backed by an `.xlsx` export of the pool's workbook.
///
/// Every sheet is read once when the workbook is opened, so later calls never
/// touch the file again. A sheet that fails to parse is kept as its error
/// message and only fails the reads of that sheet.
#[derive(Debug, Clone, Default)]
pub struct WorkbookSource {
    sheets: HashMap<String, std::result::Result<Vec<RawRow>, String>>,
}

impl WorkbookSource {
    /// Opens the workbook at `path`. Any failure here is a connection failure:
    /// nothing has been modified yet.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ResyncError::MissingInput(path.to_path_buf()));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|err: calamine::XlsxError| ResyncError::Connection(err.to_string()))?;

        let mut sheets = HashMap::new();
        for name in workbook.sheet_names().to_vec() {
            let rows = match read_sheet(&mut workbook, &name) {
                Ok(range) => {
                    let rows = range_to_rows(&range);
                    debug!(sheet = %name, row_count = rows.len(), "sheet loaded");
                    Ok(rows)
                }
                Err(err) => {
                    warn!(sheet = %name, error = %err, "sheet could not be read");
                    Err(err.to_string())
                }
            };
            sheets.insert(name, rows);
        }

        Ok(Self { sheets })
    }
}

impl SheetSource for WorkbookSource {
    fn list_rows(&self, sheet: &str) -> Result<Vec<RawRow>> {
        match self.sheets.get(sheet) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(ResyncError::InvalidWorkbook(format!(
                "sheet '{sheet}' could not be read: {message}"
            ))),
            None => Err(ResyncError::MissingSheet(sheet.to_string())),
        }
    }
}

fn read_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ResyncError::MissingSheet(name.to_string()))?;
    let range = range_result.map_err(ResyncError::from)?;
    Ok(range)
}

/// Maps each data row onto its header. Blank rows and columns without a
/// header are skipped.
fn range_to_rows(range: &calamine::Range<DataType>) -> Vec<RawRow> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_string(Some(cell)))
            .collect(),
        None => return Vec::new(),
    };

    rows.filter_map(|row| {
        let mut raw = RawRow::new();
        let mut blank = true;
        for (col_idx, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let value = cell_to_string(row.get(col_idx));
            blank &= value.is_empty();
            raw.push((header.clone(), value));
        }
        (!blank).then_some(raw)
    })
    .collect()
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string().to_uppercase(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
