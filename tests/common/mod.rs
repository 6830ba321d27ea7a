#![allow(dead_code)]

use betpool_resync::io::memory::MemorySheets;
use betpool_resync::model::RawRow;

/// Builds a raw spreadsheet row from column/value pairs.
pub fn raw(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(column, value)| (column.to_string(), value.to_string()))
        .collect()
}

/// `count` bet rows with distinct keys.
pub fn bet_rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|index| {
            let bet_id = format!("b{index}");
            raw(&[
                ("bet_id", bet_id.as_str()),
                ("match_id", "m1"),
                ("stake", "1,000"),
            ])
        })
        .collect()
}

pub const USERS_JSON: &str =
    r#"[{"username":"alice","balance":120,"display_name":"Alice"},{"username":"bob","balance":5}]"#;

/// A complete, consistent pool spreadsheet.
pub fn pool_sheets() -> MemorySheets {
    MemorySheets::new()
        .with_sheet(
            "config",
            vec![
                raw(&[("key", "season"), ("value", "2026")]),
                raw(&[("key", "users_json"), ("value", USERS_JSON)]),
            ],
        )
        .with_sheet(
            "result",
            vec![
                raw(&[("match_id", "m1"), ("home ", "Lions"), ("away", "Tigers")]),
                raw(&[("match_id", "m2"), ("home ", "Bears"), ("away", "Wolves")]),
            ],
        )
        .with_sheet(
            "odds",
            vec![
                raw(&[("odds_id", "o1"), ("match_id", "m1"), ("price", "1,250")]),
                raw(&[("odds_id", "o2"), ("match_id", "m2"), ("price", "")]),
            ],
        )
        .with_sheet(
            "bm_log",
            vec![raw(&[("log_id", "l1"), ("note", "opened book")])],
        )
        .with_sheet(
            "bets",
            vec![
                raw(&[("bet_id", "b1"), ("match_id", "m1"), ("stake", "2,000")]),
                raw(&[("bet_id", "b2"), ("match_id", "m2"), ("stake", "500")]),
                raw(&[("bet_id", "b1"), ("match_id", "m1"), ("stake", "3,000")]),
            ],
        )
}
