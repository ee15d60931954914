mod common;

use std::fs;

use common::{SCENARIO_CLEANED, SCENARIO_CSV, TestWorkspace};
use predicates::prelude::*;
use sheet_clean::config::CleanConfig;
use predicates::str::contains;
use serde_json::Value;

#[test]
fn clean_writes_reconciled_and_filled_output() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scenario.csv", SCENARIO_CSV);

    workspace
        .command()
        .arg("clean")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("renamed revenu_menage -> revenu"))
        .stdout(contains("rows 3 -> 2"));

    let output = fs::read_to_string(workspace.cleaned("scenario_cleaned.csv")).expect("output");
    assert_eq!(output, SCENARIO_CLEANED);
}

#[test]
fn cleaning_cleaned_output_changes_nothing() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scenario.csv", SCENARIO_CSV);
    workspace.command().arg("clean").arg(&input).assert().success();

    let first = workspace.cleaned("scenario_cleaned.csv");
    workspace
        .command()
        .arg("clean")
        .arg(&first)
        .assert()
        .success()
        .stdout(contains("renamed").not());

    let once = fs::read_to_string(&first).expect("first output");
    let twice =
        fs::read_to_string(workspace.cleaned("scenario_cleaned_cleaned.csv")).expect("second");
    assert_eq!(once, twice);
}

#[test]
fn clean_rejects_unsupported_format() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("report.pdf", "%PDF-1.4");

    workspace
        .command()
        .arg("clean")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("error: Unsupported file format '.pdf'"));
}

#[test]
fn clean_reports_missing_input() {
    let workspace = TestWorkspace::new();
    workspace
        .command()
        .args(["clean", "does_not_exist"])
        .assert()
        .failure()
        .stderr(contains("Input file not found"));
}

#[test]
fn clean_without_argument_uses_last_import() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("Household Income.csv", SCENARIO_CSV);

    workspace
        .command()
        .arg("import")
        .arg(&source)
        .assert()
        .success()
        .stdout(contains("as 'household_income'"));
    workspace.command().arg("clean").assert().success();

    let output = fs::read_to_string(workspace.cleaned("household_income_cleaned.csv"))
        .expect("cleaned output");
    assert_eq!(output, SCENARIO_CLEANED);

    let registry = fs::read_to_string(workspace.layout().registry_path).expect("registry");
    let registry: Value = serde_json::from_str(&registry).expect("registry json");
    assert_eq!(registry["household_income"]["encoding"], "UTF-8");
}

#[test]
fn import_suffixes_repeated_names() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("sales.csv", "a,b\n1,2\n");
    for expected in ["as 'sales'", "as 'sales_1'"] {
        workspace
            .command()
            .arg("import")
            .arg(&source)
            .assert()
            .success()
            .stdout(contains(expected));
    }
    assert!(workspace.layout().raw_dir.join("sales_1.csv").exists());
}

#[test]
fn import_fails_when_no_source_succeeds() {
    let workspace = TestWorkspace::new();
    workspace
        .command()
        .args(["import", "/nowhere/a.csv,/nowhere/b.csv"])
        .assert()
        .failure()
        .stderr(contains("None of the 2 source(s) could be imported"));
}

#[test]
fn classify_prints_split_as_json() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scenario.csv", SCENARIO_CSV);
    workspace.command().arg("clean").arg(&input).assert().success();

    let assert = workspace
        .command()
        .args(["classify", "scenario", "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let payload: Value = serde_json::from_str(&stdout).expect("json");
    assert_eq!(payload["numeric"], serde_json::json!(["annee", "revenu"]));
    assert_eq!(payload["categorical"], serde_json::json!(["notes"]));
}

#[test]
fn chart_lists_options_and_rejects_categorical_y() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scenario.csv", SCENARIO_CSV);
    workspace.command().arg("clean").arg(&input).assert().success();

    workspace
        .command()
        .args(["chart", "scenario", "-x", "notes"])
        .assert()
        .success()
        .stdout(contains("bar_count"))
        .stdout(contains("pie_count"));

    workspace
        .command()
        .args(["chart", "scenario", "-x", "notes", "-y", "revenu", "--kind", "bar"])
        .assert()
        .success()
        .stdout(contains("600"))
        .stdout(contains("revenu: min 0, max 1200, mean 600 over 2 value(s)"));

    workspace
        .command()
        .args(["chart", "scenario", "-x", "annee", "-y", "notes"])
        .assert()
        .failure()
        .stderr(contains("Column 'notes' is not numeric"));

    workspace
        .command()
        .args(["chart", "scenario", "-x", "annee", "--kind", "scatter"])
        .assert()
        .failure()
        .stderr(contains("does not fit these axes"));
}

#[test]
fn preview_reports_detected_layout() {
    let workspace = TestWorkspace::new();
    let (bytes, _, _) = encoding_rs::WINDOWS_1252
        .encode("région;revenu\nQuébec;1200\nMontréal;900\nLévis;820\nTrois-Rivières;750\n");
    let input = workspace.write_bytes("latin.csv", &bytes);

    workspace
        .command()
        .arg("preview")
        .arg("-i")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("encoding windows-1252, delimiter ';'"))
        .stdout(contains("Québec"))
        .stdout(contains("numeric: revenu"));
}

#[test]
fn run_imports_cleans_and_classifies() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("scenario.csv", SCENARIO_CSV);

    workspace
        .command()
        .arg("run")
        .arg(&source)
        .assert()
        .success()
        .stdout(contains("Imported"))
        .stdout(contains("numeric: annee, revenu"))
        .stdout(contains("categorical: notes"));
    assert!(workspace.cleaned("scenario_cleaned.csv").exists());
}

#[test]
fn invalid_config_is_rejected() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("config.yaml", "numeric_threshold: 1.5\n");
    workspace
        .command()
        .arg("--config")
        .arg(&config)
        .args(["classify"])
        .assert()
        .failure()
        .stderr(contains("Invalid configuration"));
}

#[test]
fn clean_by_name_finds_tsv_import() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("Budget.tsv", "Poste\tMontant\nloyer\t800\n");
    workspace.command().arg("import").arg(&source).assert().success();

    workspace.command().arg("clean").assert().success();
    workspace.command().args(["clean", "budget"]).assert().success();
    let output = fs::read_to_string(workspace.cleaned("budget_cleaned.csv")).expect("output");
    assert_eq!(output, "poste,montant\nloyer,800\n");
}

#[test]
fn import_name_cannot_leave_raw_directory() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("sales.csv", "a,b\n1,2\n");
    workspace
        .command()
        .arg("import")
        .arg(&source)
        .args(["--name", "../../escaped"])
        .assert()
        .success()
        .stdout(contains("as 'escaped'"));
    assert!(workspace.layout().raw_dir.join("escaped.csv").exists());
    assert!(!workspace.path().join("escaped.csv").exists());
}

#[test]
fn list_shows_imports_and_cleaned_files() {
    let workspace = TestWorkspace::new();
    workspace
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("No imports registered"))
        .stdout(contains("Cleaned files: 0"));

    let source = workspace.write("scenario.csv", SCENARIO_CSV);
    workspace.command().arg("run").arg(&source).assert().success();
    workspace
        .command()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("scenario"))
        .stdout(contains("UTF-8"))
        .stdout(contains("Cleaned files: 1"))
        .stdout(contains("scenario_cleaned.csv"));
}

#[test]
fn config_prints_synonyms_and_writes_effective_yaml() {
    let workspace = TestWorkspace::new();
    workspace
        .command()
        .arg("config")
        .assert()
        .success()
        .stdout(contains("revenu_menage"))
        .stdout(contains("similarity threshold 0.8, numeric threshold 0.8"));

    let target = workspace.path().join("effective.yaml");
    workspace
        .command()
        .arg("config")
        .arg("--write")
        .arg(&target)
        .assert()
        .success()
        .stdout(contains("Wrote configuration"));
    let written = CleanConfig::load(&target).expect("load written config");
    assert_eq!(written, workspace.config());
}
