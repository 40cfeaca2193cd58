//! Trace Loader Tests.

use std::io::Write;

use minirank_core::sim::{TraceError, TraceRecord, check_bounds, load_trace, parse_trace};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

const TRACE: &str = r#"# arrival-ordered except the last line
{"at": 0, "rank": 0, "bank": 3, "row": 5, "is_read": true}

{"at": 40, "rank": 1, "bank": 0, "row": 9, "is_read": false}
{"at": 40, "rank": 0, "bank": 1, "row": 2, "is_read": true}
{"at": 10, "rank": 0, "bank": 3, "row": 5, "is_read": false}
"#;

#[test]
fn comments_and_blank_lines_are_skipped() {
    let records = parse_trace(TRACE.as_bytes()).unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0],
        TraceRecord {
            at: 0,
            rank: 0,
            bank: 3,
            row: 5,
            is_read: true
        }
    );
}

#[test]
fn records_are_sorted_stably_by_arrival() {
    let records = parse_trace(TRACE.as_bytes()).unwrap();
    let order: Vec<(u64, u8)> = records.iter().map(|r| (r.at, r.bank)).collect();
    assert_eq!(order, vec![(0, 3), (10, 3), (40, 0), (40, 1)]);
}

#[test]
fn parse_error_names_the_line() {
    let input = "{\"at\": 0, \"rank\": 0, \"bank\": 0, \"row\": 1, \"is_read\": true}\n\n{\"at\": 5}\n";
    let err = parse_trace(input.as_bytes()).unwrap_err();
    assert!(matches!(err, TraceError::Parse { line: 3, .. }));
}

#[test]
fn bounds_check_reports_first_offender() {
    let records = parse_trace(TRACE.as_bytes()).unwrap();
    assert!(check_bounds(&records, 2, 8).is_ok());

    let err = check_bounds(&records, 1, 8).unwrap_err();
    assert!(matches!(
        err,
        TraceError::OutOfRange {
            index: 2,
            rank: 1,
            bank: 0
        }
    ));
    assert_eq!(
        err.to_string(),
        "trace record 2: rank 1 bank 0 outside the configured device"
    );
}

#[test]
fn load_trace_reads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(TRACE.as_bytes()).unwrap();
    file.flush().unwrap();

    let records = load_trace(file.path()).unwrap();
    assert_eq!(records, parse_trace(TRACE.as_bytes()).unwrap());
}

#[test]
fn missing_trace_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_trace(dir.path().join("absent.jsonl")).unwrap_err();
    assert!(matches!(err, TraceError::Io(_)));
}
