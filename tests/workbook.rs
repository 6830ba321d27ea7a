use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use betpool_resync::ResyncError;
use betpool_resync::config::ResyncOptions;
use betpool_resync::io::memory::MemoryBackend;
use betpool_resync::io::sheets::SheetSource;
use betpool_resync::io::workbook::WorkbookSource;
use betpool_resync::model::RawRow;
use betpool_resync::orchestrator::run_full_resync;
use betpool_resync::report::{Phase, Status};
use rust_xlsxwriter::Workbook;
use serde_json::json;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Worksheet part of the `bets` sheet, the fifth sheet written.
const BETS_PART: &str = "xl/worksheets/sheet5.xml";

/// Worksheet whose only cell points at a shared string with a non-numeric
/// index.
const BROKEN_WORKSHEET: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<sheetData><row r="1"><c r="A1" t="s"><v>not-a-number</v></c></row></sheetData>"#,
    r#"</worksheet>"#,
);

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

fn add_sheet(workbook: &mut Workbook, name: &str, rows: &[&[Cell<'_>]]) {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name).expect("sheet named");
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet
                        .write_string(row_idx as u32, col_idx as u16, *value)
                        .expect("string written");
                }
                Cell::Number(value) => {
                    worksheet
                        .write_number(row_idx as u32, col_idx as u16, *value)
                        .expect("number written");
                }
                Cell::Blank => {}
            }
        }
    }
}

fn cell<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.iter()
        .find(|(name, _)| name == column)
        .map(|(_, value)| value.as_str())
}

/// Copies the workbook at `source` to `target`, replacing one worksheet part.
fn replace_part(source: &Path, target: &Path, part: &str, contents: &str) {
    let mut archive = ZipArchive::new(File::open(source).expect("source opened"))
        .expect("source is a zip archive");
    let mut writer = ZipWriter::new(File::create(target).expect("target created"));

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).expect("entry read");
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).expect("entry bytes read");
        if name == part {
            bytes = contents.as_bytes().to_vec();
        }
        writer
            .start_file(name, SimpleFileOptions::default())
            .expect("entry started");
        writer.write_all(&bytes).expect("entry written");
    }
    writer.finish().expect("archive finished");
}

fn write_pool_workbook(path: &Path) {
    use Cell::{Blank, Number, Text};

    let mut workbook = Workbook::new();
    add_sheet(
        &mut workbook,
        "config",
        &[
            &[Text("key"), Text("value")],
            &[Text("season"), Number(2026.0)],
            &[
                Text("users_json"),
                Text(r#"[{"username":"alice","balance":40}]"#),
            ],
        ],
    );
    add_sheet(
        &mut workbook,
        "result",
        &[
            &[Text("match_id"), Text(" home")],
            &[Text("m1"), Text("Lions")],
        ],
    );
    add_sheet(
        &mut workbook,
        "odds",
        &[&[Text("odds_id"), Text("match_id"), Text("price")]],
    );
    add_sheet(
        &mut workbook,
        "bm_log",
        &[
            &[Text("log_id"), Text("note")],
            &[Text("l1"), Text("opened")],
        ],
    );
    add_sheet(
        &mut workbook,
        "bets",
        &[
            &[Text("bet_id"), Text("stake"), Blank, Text("amount")],
            &[Text("b1"), Text("1,000"), Text("ignored"), Number(1500.0)],
            &[Blank, Blank, Blank, Blank],
            &[Text("b2"), Blank, Blank, Number(2.5)],
        ],
    );
    workbook.save(path).expect("workbook saved");
}

#[test]
fn rows_are_keyed_by_header_and_blank_rows_skipped() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("pool.xlsx");
    write_pool_workbook(&path);

    let source = WorkbookSource::open(&path).expect("workbook opened");
    let bets = source.list_rows("bets").expect("bets read");

    assert_eq!(bets.len(), 2);
    assert_eq!(cell(&bets[0], "bet_id"), Some("b1"));
    assert_eq!(cell(&bets[0], "stake"), Some("1,000"));
    assert_eq!(cell(&bets[0], "amount"), Some("1500"));
    assert_eq!(bets[0].len(), 3);
    assert_eq!(cell(&bets[1], "stake"), Some(""));
    assert_eq!(cell(&bets[1], "amount"), Some("2.5"));
}

#[test]
fn raw_rows_keep_sheet_column_order() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("pool.xlsx");
    write_pool_workbook(&path);

    let source = WorkbookSource::open(&path).expect("workbook opened");
    let result = source.list_rows("result").expect("result read");

    let columns: Vec<&str> = result[0].iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(columns, vec!["match_id", " home"]);
}

#[test]
fn unreadable_sheet_only_fails_its_own_reads() {
    let temp_dir = tempdir().expect("temporary directory");
    let intact = temp_dir.path().join("intact.xlsx");
    let broken = temp_dir.path().join("broken.xlsx");
    write_pool_workbook(&intact);
    replace_part(&intact, &broken, BETS_PART, BROKEN_WORKSHEET);

    let source = WorkbookSource::open(&broken).expect("workbook opened despite one bad sheet");

    assert!(matches!(
        source.list_rows("bets"),
        Err(ResyncError::InvalidWorkbook(message)) if message.contains("bets")
    ));
    assert_eq!(source.list_rows("bm_log").expect("bm_log read").len(), 1);
}

#[test]
fn unreadable_sheet_fails_only_its_table_during_a_resync() {
    let temp_dir = tempdir().expect("temporary directory");
    let intact = temp_dir.path().join("intact.xlsx");
    let broken = temp_dir.path().join("broken.xlsx");
    write_pool_workbook(&intact);
    replace_part(&intact, &broken, BETS_PART, BROKEN_WORKSHEET);

    let mut backend = MemoryBackend::new();
    let report = run_full_resync(
        || Ok((WorkbookSource::open(&broken)?, &mut backend)),
        ResyncOptions::default(),
    );

    assert_eq!(report.final_phase, Phase::Done, "{report}");
    let status = |table: &str| {
        report
            .entry_for(Phase::RebuildingCore, table)
            .unwrap_or_else(|| panic!("entry for {table}"))
            .status
    };
    assert_eq!(status("bets"), Status::Error);
    assert_eq!(status("config"), Status::Ok);
    assert_eq!(status("result"), Status::Ok);
    assert_eq!(status("bm_log"), Status::Ok);
    assert_eq!(status("odds"), Status::Warning);
    assert!(backend.rows("bets").is_empty());
    assert_eq!(backend.rows("users").len(), 1);
}

#[test]
fn header_only_sheet_has_no_rows() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("pool.xlsx");
    write_pool_workbook(&path);

    let source = WorkbookSource::open(&path).expect("workbook opened");

    assert!(source.list_rows("odds").expect("odds read").is_empty());
    assert!(matches!(
        source.list_rows("missing"),
        Err(ResyncError::MissingSheet(name)) if name == "missing"
    ));
}

#[test]
fn missing_workbook_is_reported() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("absent.xlsx");

    assert!(matches!(
        WorkbookSource::open(&path),
        Err(ResyncError::MissingInput(missing)) if missing == path
    ));
}

#[test]
fn workbook_drives_a_full_resync() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("pool.xlsx");
    write_pool_workbook(&path);

    let mut backend = MemoryBackend::new();
    let report = run_full_resync(
        || Ok((WorkbookSource::open(&path)?, &mut backend)),
        ResyncOptions::default(),
    );

    assert_eq!(report.final_phase, Phase::Done, "{report}");
    assert!(!report.has_errors(), "{report}");
    assert_eq!(
        report
            .entry_for(Phase::RebuildingCore, "odds")
            .expect("odds entry")
            .status,
        Status::Warning
    );

    assert_eq!(
        serde_json::Value::Object(backend.rows("users")[0].clone()),
        json!({"username": "alice", "balance": 0})
    );
    assert_eq!(
        serde_json::Value::Object(backend.rows("bets")[0].clone()),
        json!({"bet_id": "b1", "stake": 1000, "amount": "1500"})
    );
    assert_eq!(
        serde_json::Value::Object(backend.rows("result")[0].clone()),
        json!({"match_id": "m1", "home": "Lions"})
    );
    assert_eq!(backend.rows("config").len(), 2);
}
