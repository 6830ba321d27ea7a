use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A spreadsheet row exactly as the sheet reader produced it: column name and
/// the cell's displayed text, in sheet column order. Column names may still
/// carry stray whitespace.
pub type RawRow = Vec<(String, String)>;

/// A JSON object as it travels over the wire to the backend.
pub type Row = Map<String, Value>;

/// Represents a cleaned cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell.
    Null,
    /// Number recovered from a comma-grouped numeric string.
    Number(f64),
    /// Any other text, kept verbatim.
    Text(String),
}

impl CellValue {
    /// Converts the value into its JSON representation. Integral numbers are
    /// emitted without a fractional part so integer columns accept them.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Number(value) => number_to_json(*value),
            CellValue::Text(value) => Value::String(value.clone()),
        }
    }

    /// Returns the canonical key used to identify a record by this value,
    /// or `None` for an empty cell.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Number(value) => Some(value.to_string()),
            CellValue::Text(value) => Some(value.clone()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// A normalised spreadsheet row with trimmed column names and typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, CellValue>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    /// Key of the record for the given primary-key column. Missing and empty
    /// cells both yield `None`.
    pub fn key(&self, column: &str) -> Option<String> {
        self.get(column).and_then(CellValue::as_key)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Converts the record into the JSON object sent to the backend.
    pub fn to_row(&self) -> Row {
        self.fields
            .iter()
            .map(|(column, value)| (column.clone(), value.to_json()))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value))
                .collect(),
        }
    }
}

/// Static descriptor binding a sheet to the backend table it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub sheet: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
}

impl TableSpec {
    pub const fn new(sheet: &'static str, table: &'static str, primary_key: &'static str) -> Self {
        Self {
            sheet,
            table,
            primary_key,
        }
    }
}

pub const CONFIG: TableSpec = TableSpec::new("config", "config", "key");
pub const RESULT: TableSpec = TableSpec::new("result", "result", "match_id");
pub const ODDS: TableSpec = TableSpec::new("odds", "odds", "odds_id");
pub const BM_LOG: TableSpec = TableSpec::new("bm_log", "bm_log", "log_id");
pub const BETS: TableSpec = TableSpec::new("bets", "bets", "bet_id");

/// Identity table. Never truncated, only upserted.
pub const USERS_TABLE: &str = "users";
/// Conflict column for identity upserts.
pub const USERS_CONFLICT_KEY: &str = "username";
/// Column of the config sheet that holds each setting's value.
pub const CONFIG_VALUE_COLUMN: &str = "value";
/// Identity field reset on every rebuild.
pub const BALANCE_FIELD: &str = "balance";

/// Tables wiped at the start of a run, children before parents.
pub const TRUNCATE_ORDER: [TableSpec; 5] = [BETS, ODDS, RESULT, BM_LOG, CONFIG];

/// Tables rebuilt after truncation, parents before children.
pub const REBUILD_ORDER: [TableSpec; 5] = [CONFIG, RESULT, ODDS, BM_LOG, BETS];
