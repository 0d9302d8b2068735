//! Assertions over written reports.

use pidff_common::report::Report;

/// Report ids of `reports`, in order.
pub fn report_ids(reports: &[Report]) -> Vec<u8> {
    reports.iter().map(Report::report_id).collect()
}

/// Hex lines of `reports`, one per report.
pub fn hex_lines(reports: &[Report]) -> String {
    reports
        .iter()
        .map(Report::to_hex)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assert that `reports` carry exactly these report ids, in order.
#[track_caller]
pub fn assert_report_ids(reports: &[Report], expected: &[u8]) {
    let actual = report_ids(reports);
    assert_eq!(
        actual,
        expected,
        "report ids differ\n  written:\n{}",
        hex_lines(reports)
    );
}

/// Assert that no report with `report_id` was written.
#[track_caller]
pub fn assert_no_report(reports: &[Report], report_id: u8) {
    if let Some(report) = reports.iter().find(|r| r.report_id() == report_id) {
        panic!("unexpected report {report_id:#04x}: {}", report.to_hex());
    }
}

/// The single report with `report_id`, panicking unless there is exactly one.
#[track_caller]
pub fn only_report(reports: &[Report], report_id: u8) -> &Report {
    let mut matching = reports.iter().filter(|r| r.report_id() == report_id);
    match (matching.next(), matching.next()) {
        (Some(report), None) => report,
        (None, _) => panic!("no report {report_id:#04x} in\n{}", hex_lines(reports)),
        (Some(_), Some(_)) => panic!("several reports {report_id:#04x} in\n{}", hex_lines(reports)),
    }
}
