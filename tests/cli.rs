mod common;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

use common::{SALES_CSV, TestWorkspace};

fn dashboard() -> Command {
    Command::cargo_bin("sales-dashboard").expect("binary exists")
}

#[test]
fn summary_prints_kpis_and_series() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    dashboard()
        .args(["summary", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("== KPIs"))
        .stdout(contains("$220"))
        .stdout(contains("Margin"))
        .stdout(contains("$125"))
        .stdout(contains("Revenue by Region"))
        .stdout(contains("Units by region and month"));
}

#[test]
fn summary_json_applies_region_filter() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    let output = dashboard()
        .args([
            "summary",
            "-i",
            input.to_str().unwrap(),
            "--region",
            "East",
            "--json",
        ])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["kpis"]["total_revenue"].as_f64(), Some(140.0));
    assert_eq!(json["kpis"]["total_units"].as_f64(), Some(12.0));
    assert_eq!(json["rows"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["kpis"]["margin"]["mode"], "currency-sum");
    assert_eq!(json["time_series"]["points"][0]["label"], "2024-01-05");
}

#[test]
fn table_sort_clicks_toggle_direction() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    let output = dashboard()
        .args([
            "table",
            "-i",
            input.to_str().unwrap(),
            "--sort",
            "revenue",
            "--sort",
            "revenue",
            "--limit",
            "2",
        ])
        .output()
        .expect("run table");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("date"));
    assert!(lines[0].ends_with("margin"));
    assert!(lines[2].contains("$100"));
    assert!(lines[3].contains("$50"));
}

#[test]
fn table_rejects_unknown_sort_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    dashboard()
        .args(["table", "-i", input.to_str().unwrap(), "--sort", "missing"])
        .assert()
        .failure()
        .stderr(contains("Column 'missing' not found"));
}

#[test]
fn export_writes_filtered_csv() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    let output = workspace.path().join("online.csv");
    dashboard()
        .args([
            "export",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--search",
            "ONLINE",
        ])
        .assert()
        .success();
    let contents = fs::read_to_string(&output).expect("read export");
    let lines = contents.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "date,region,channel,product,units,revenue,cost,margin"
    );
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "2024-01-05,East,Online,Widget,10,100,60,40");
    assert_eq!(lines[2], "2024-02-14,South,Online,Gizmo,3,30,10,20");
}

#[test]
fn stdin_input_is_supported() {
    dashboard()
        .args(["summary", "-i", "-"])
        .write_stdin("date,region,units,revenue\n2024-01-01,East,10,100\n2024-01-02,West,5,50\n")
        .assert()
        .success()
        .stdout(contains("$150"));
}

#[test]
fn zero_window_is_rejected() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", SALES_CSV);
    dashboard()
        .args(["summary", "-i", input.to_str().unwrap(), "--window", "0"])
        .assert()
        .failure()
        .stderr(contains("Invalid argument"));
}

#[test]
fn empty_input_reports_malformed_csv() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.csv", "\n\n");
    dashboard()
        .args(["summary", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Malformed input"));
}

#[test]
fn missing_sample_is_not_fatal() {
    let workspace = TestWorkspace::new();
    dashboard()
        .current_dir(workspace.path())
        .args(["summary"])
        .assert()
        .success()
        .stdout(contains("No data loaded."));
}

#[test]
fn explicit_sample_flag_fails_when_sample_is_missing() {
    let workspace = TestWorkspace::new();
    dashboard()
        .current_dir(workspace.path())
        .args(["summary", "--sample"])
        .assert()
        .failure()
        .stderr(contains("Loading sample data from 'sample-data.csv'"));
}

#[test]
fn sort_column_lookup_is_case_insensitive() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sales.csv", "Region,Units\nEast,10\nWest,9\n");
    dashboard()
        .args(["table", "-i", input.to_str().unwrap(), "--sort", "units"])
        .assert()
        .success()
        .stdout(contains("West    9\nEast    10"));
}

#[test]
fn bundled_sample_loads_from_working_directory() {
    dashboard()
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["summary", "--sample"])
        .assert()
        .success()
        .stdout(contains("== KPIs"))
        .stdout(contains("3-pt MA"));
}

#[test]
fn config_overrides_role_synonyms() {
    let workspace = TestWorkspace::new();
    let config = workspace.write(
        "dashboard.yaml",
        "forecast_window: 2\nroles:\n  date: [day]\n  revenue: [net_sales]\n",
    );
    let input = workspace.write(
        "renamed.csv",
        "day,net_sales\n2024-03-01,10\n2024-03-02,30\n",
    );
    let output = dashboard()
        .args([
            "summary",
            "-i",
            input.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
            "--json",
        ])
        .output()
        .expect("run summary");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["kpis"]["total_revenue"].as_f64(), Some(40.0));
    assert_eq!(json["forecast"]["window"].as_u64(), Some(2));
    assert_eq!(
        json["forecast"]["moving_average"]["points"][1]["value"].as_f64(),
        Some(20.0)
    );
}
