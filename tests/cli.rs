mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

fn bin() -> Command {
    Command::cargo_bin("moldshop-report").expect("binary exists")
}

fn sheet() -> String {
    fixture_path("repairs.csv").to_str().unwrap().to_string()
}

#[test]
fn probe_lists_detected_columns() {
    bin()
        .args(["probe", "-i", &sheet()])
        .assert()
        .success()
        .stdout(contains("repair-type"))
        .stdout(contains("نوع تعمیر"))
        .stdout(contains("مقدار ساعت کار شده"))
        .stdout(contains("7 row(s)"));
}

#[test]
fn probe_reports_unresolved_roles() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("plain.csv", "Part,Hours\nP1,2\n");
    bin()
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("(unresolved)"));
}

#[test]
fn group_prints_sorted_table_with_total() {
    let assert = bin()
        .args([
            "group",
            "-i",
            &sheet(),
            "--from",
            "1402/01/01",
            "--to",
            "1402/01/10",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert!(lines[2].starts_with("D1"), "{stdout}");
    assert!(lines[3].starts_with("P1"), "{stdout}");
    assert!(lines[4].starts_with("P2"), "{stdout}");
    let total = lines.last().unwrap();
    assert!(total.starts_with("total"), "{stdout}");
    assert!(total.ends_with("11.5"), "{stdout}");
}

#[test]
fn group_exports_csv_with_bom() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("report.csv");
    bin()
        .args([
            "group",
            "-i",
            &sheet(),
            "--format",
            "csv",
            "--excel-bom",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&output).unwrap();
    assert!(contents.starts_with('\u{FEFF}'));
    let lines = contents.trim_start_matches('\u{FEFF}').lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "قالب / قطعه / دستگاه,کد قالب,شماره نامه درخواست,مقدار ساعت کار شده"
    );
    assert_eq!(lines[1], "P1,C1,101,7");
    assert_eq!(lines.len(), 6);
}

#[test]
fn group_json_carries_total_and_columns() {
    let assert = bin()
        .args(["group", "-i", &sheet(), "--by", "part", "--format", "json"])
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["total"], 18.5);
    assert_eq!(report["measure_column"], "مقدار ساعت کار شده");
    let rows = report["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["key"][0], "P1");
    assert_eq!(rows[0]["sum"], 7.0);
}

#[test]
fn group_json_total_of_an_empty_selection_is_zero() {
    let assert = bin()
        .args(["group", "-i", &sheet(), "--part", "nope", "--format", "json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(!stdout.contains("-0"), "{stdout}");
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["total"], 0.0);
    assert!(report["rows"].as_array().unwrap().is_empty());
}

#[test]
fn group_by_category_merges_variants() {
    bin()
        .args(["group", "-i", &sheet(), "--by-category", "--format", "csv"])
        .assert()
        .success()
        .stdout(contains("mold-repair,9"))
        .stdout(contains("part-repair,2.5"));
}

#[test]
fn group_without_any_resolved_key_fails() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("hours.csv", "Hours,Notes\n1,a\n");
    bin()
        .args(["group", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("No grouping columns available"));
}

#[test]
fn filter_by_normalized_repair_type() {
    let assert = bin()
        .args([
            "filter",
            "-i",
            &sheet(),
            "--repair-type",
            "mold-repair",
            "--format",
            "csv",
            "--with-normalized",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("repair-type (normalized)"));
    assert_eq!(lines[2], "2023-03-21,قالب تعمیری:,P1,C1,101,3,mold-repair");
}

#[test]
fn filter_all_sentinel_keeps_everything() {
    bin()
        .args(["filter", "-i", &sheet(), "--part", "(همه)"])
        .assert()
        .success()
        .stdout(contains("7 row(s)"));
}

#[test]
fn one_sided_date_range_warns_and_continues() {
    bin()
        .args(["filter", "-i", &sheet(), "--from", "1402/01/01", "--part", "P2"])
        .assert()
        .success()
        .stderr(contains("warning:"))
        .stdout(contains("2 row(s)"));
}

#[test]
fn combined_filters_narrow_in_order() {
    bin()
        .args([
            "filter",
            "-i",
            &sheet(),
            "--repair-types",
            "mold-repair,part-repair",
            "--min",
            "2.5",
            "--filter",
            "date=1402/01/01..1402/01/31",
        ])
        .assert()
        .success()
        .stdout(contains("2 row(s)"));
}

#[test]
fn unknown_role_in_filter_expression_fails() {
    bin()
        .args(["filter", "-i", &sheet(), "--filter", "colour=red"])
        .assert()
        .failure()
        .stderr(contains("Unknown role 'colour'"));
}

#[test]
fn summary_json_reports_dashboard_figures() {
    let assert = bin()
        .args(["summary", "-i", &sheet(), "--json"])
        .assert()
        .success();
    let stats: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stats["records"], 7);
    assert_eq!(stats["distinct_repair_types"], 5);
    assert_eq!(stats["measure"]["counted"], 6);
    assert_eq!(stats["measure"]["total"], 18.5);
    assert_eq!(stats["measure"]["max"], 6.0);
    assert_eq!(stats["measure"]["min"], 1.0);
}

#[test]
fn timeline_labels_days_in_jalali() {
    bin()
        .args(["timeline", "-i", &sheet(), "--days", "2"])
        .assert()
        .success()
        .stdout(contains("1402/01/13"))
        .stdout(contains("2023-04-02"))
        .stdout(contains("1402/01/10").not());
}

#[test]
fn options_list_normalized_repair_types() {
    bin()
        .args(["options", "-i", &sheet(), "--role", "repair-type"])
        .assert()
        .success()
        .stdout("device-repair\nmold\nmold-repair\npart-repair\nrepair\n");
}

#[test]
fn part_options_follow_the_repair_type_selection() {
    bin()
        .args([
            "options",
            "-i",
            &sheet(),
            "--role",
            "part",
            "--for-repair-type",
            "mold-repair",
            "--with-all",
        ])
        .assert()
        .success()
        .stdout("(همه)\nP1\nP2\n");

    bin()
        .args([
            "options",
            "-i",
            &sheet(),
            "--role",
            "part",
            "--for-repair-type",
            "(همه)",
        ])
        .assert()
        .success()
        .stdout("D1\nP1\nP2\nP3\n");
}

#[test]
fn config_file_changes_detection_and_layout() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "shop.tsv",
        "Kind\tDie No\tLabour\n\
         die fix\tD-1\t2\n\
         die fix\tD-1\t3\n\
         press\tD-2\t1\n",
    );
    let config = workspace.write(
        "engine.yaml",
        "candidates:\n  repair-type: [kind]\n  part-id: [die no]\n  measure: [labour]\n\
         taxonomy:\n  mold: [die]\n  repair: [fix]\n\
         group_by: [repair-type]\n",
    );
    bin()
        .args([
            "group",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout("Kind,Labour\ndie fix,5\npress,1\n");

    bin()
        .args([
            "filter",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "--repair-type",
            "mold-repair",
        ])
        .assert()
        .success()
        .stdout(contains("2 row(s)"));
}

#[test]
fn invalid_config_is_reported() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("bad.yaml", "colour: blue\n");
    bin()
        .args(["probe", "-i", &sheet(), "-c", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Loading configuration"));
}

#[test]
fn windows_1256_input_is_decoded() {
    let workspace = TestWorkspace::new();
    let text = "قالب,ساعت\nق-12,2\n";
    let (bytes, _, _) = encoding_rs::WINDOWS_1256.encode(text);
    let input = workspace.path().join("legacy.csv");
    fs::write(&input, &bytes).unwrap();
    bin()
        .args([
            "options",
            "-i",
            input.to_str().unwrap(),
            "--input-encoding",
            "windows-1256",
            "--role",
            "part-id",
        ])
        .assert()
        .success()
        .stdout("ق-12\n");
}

#[test]
fn stdin_input_is_supported() {
    bin()
        .args(["summary", "-i", "-"])
        .write_stdin("Part,Hours\nP1,2\nP2,x\n")
        .assert()
        .success()
        .stdout(contains("records"))
        .stdout(contains("Hours total"));
}

#[test]
fn filter_export_keeps_cells_as_written() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "ids.csv",
        "Date,Repair Type,Part,Mold Code,Request No,Hours\n\
         2023-03-21,mold repair,007,0123,0042,1.50\n\
         2023-03-22,mold repair,7,123,42,2\n",
    );
    bin()
        .args([
            "filter",
            "-i",
            input.to_str().unwrap(),
            "--filter",
            "part=007",
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(
            "Date,Repair Type,Part,Mold Code,Request No,Hours\n\
             2023-03-21,mold repair,007,0123,0042,1.50\n",
        );
}

#[test]
fn filter_substring_search_on_parts() {
    let assert = bin()
        .args(["filter", "-i", &sheet(), "--filter", "part~P", "--format", "csv"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 7);
    assert!(lines[1..].iter().all(|line| !line.contains(",D1,")));
}
