use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn run_migrant(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_migrant"))
        .current_dir(root)
        .env_remove("MIGRANT_CONFIG")
        .env_remove("MIGRANT_DB_PATH")
        .env("NO_COLOR", "1")
        .arg("--db")
        .arg(root.join("site.sqlite"))
        .args(args)
        .output()
        .expect("migrant command should run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn parse_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid json")
}

fn write_csv(root: &Path, name: &str, contents: &str) -> String {
    let path = root.join(name);
    std::fs::write(&path, contents).expect("csv should be writable");
    path.display().to_string()
}

#[test]
fn import_terms_builds_tree_and_second_run_creates_nothing() {
    let root = unique_workspace("migrant-cli-import");
    assert_success(&run_migrant(&root, &["taxonomy", "add", "location"]));
    let csv = write_csv(
        &root,
        "locations.csv",
        "country,state,city\nUSA,Ohio,Columbus\nUSA,Ohio,Dayton\nUSA,,Texas\nCanada\n",
    );

    let first = run_migrant(&root, &["import-terms", "location", "--file", &csv]);
    assert_success(&first);
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("created added Columbus"));
    assert!(stdout.contains("imported 6 term(s) into location"));

    let second = run_migrant(&root, &["import-terms", "location", "--file", &csv, "--json"]);
    assert_success(&second);
    let summary = parse_json(&second);
    assert_eq!(summary["created_count"], 0);
    assert_eq!(summary["skipped_count"], 9);
    assert_eq!(summary["status"], "completed");

    let terms = run_migrant(&root, &["terms", "location", "--json"]);
    assert_success(&terms);
    let terms = parse_json(&terms);
    let terms = terms.as_array().expect("terms should be an array");
    assert_eq!(terms.len(), 6);
    let id_of = |name: &str| {
        terms
            .iter()
            .find(|term| term["name"] == name)
            .map(|term| term["id"].clone())
            .expect("term should be listed")
    };
    let texas = terms
        .iter()
        .find(|term| term["name"] == "Texas")
        .expect("texas should be listed");
    assert_eq!(texas["parent_id"], id_of("USA"));
    let usa = terms
        .iter()
        .find(|term| term["name"] == "USA")
        .expect("usa should be listed");
    assert_eq!(usa["child_count"], 2);

    let runs = run_migrant(&root, &["runs", "--json"]);
    assert_success(&runs);
    assert_eq!(parse_json(&runs).as_array().map(Vec::len), Some(2));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn import_terms_fails_for_unknown_taxonomy_and_missing_file() {
    let root = unique_workspace("migrant-cli-errors");
    let csv = write_csv(&root, "terms.csv", "name\nNews\n");

    let unknown = run_migrant(&root, &["import-terms", "category", "--file", &csv]);
    assert_failure(&unknown);
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("category"));

    assert_success(&run_migrant(&root, &["taxonomy", "add", "category"]));
    let missing = run_migrant(&root, &["import-terms", "category"]);
    assert_failure(&missing);
    assert!(String::from_utf8_lossy(&missing.stderr).starts_with("error:"));

    let runs = run_migrant(&root, &["runs", "--json"]);
    assert_success(&runs);
    assert_eq!(parse_json(&runs).as_array().map(Vec::len), Some(0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn check_and_strict_import_refuse_ambiguous_parents() {
    let root = unique_workspace("migrant-cli-check");
    assert_success(&run_migrant(&root, &["taxonomy", "add", "location"]));
    let csv = write_csv(
        &root,
        "regions.tsv",
        "region\tarea\ttown\nEast\tNorth\tSpringfield\nWest\tNorth\tShelbyville\n",
    );

    let check = run_migrant(
        &root,
        &["check", "location", "--file", &csv, "--delimiter", "tab", "--json"],
    );
    assert_failure(&check);
    let report = parse_json(&check);
    assert_eq!(report[0]["name"], "North");

    let strict = run_migrant(
        &root,
        &[
            "import-terms",
            "location",
            "--file",
            &csv,
            "--delimiter",
            "tab",
            "--strict",
        ],
    );
    assert_failure(&strict);

    let terms = run_migrant(&root, &["terms", "location", "--json"]);
    assert_success(&terms);
    assert_eq!(parse_json(&terms).as_array().map(Vec::len), Some(0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn dry_run_reports_plan_without_writing_terms() {
    let root = unique_workspace("migrant-cli-dry-run");
    assert_success(&run_migrant(&root, &["taxonomy", "add", "location"]));
    let csv = write_csv(&root, "locations.csv", "a,b\nUSA,Ohio\n");

    let plan = run_migrant(
        &root,
        &["import-terms", "location", "--file", &csv, "--dry-run"],
    );
    assert_success(&plan);
    assert!(String::from_utf8_lossy(&plan.stdout).contains("would import 2 term(s)"));

    let terms = run_migrant(&root, &["terms", "location", "--json"]);
    assert_success(&terms);
    assert_eq!(parse_json(&terms).as_array().map(Vec::len), Some(0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn config_file_registers_taxonomies_and_sets_delimiter() {
    let root = unique_workspace("migrant-cli-config");
    std::fs::write(
        root.join("migrant.toml"),
        "delimiter = \";\"\n\n[[taxonomies]]\nname = \"category\"\n\n[[taxonomies]]\nname = \"post_tag\"\nhierarchical = false\n",
    )
    .expect("config should be writable");

    let listed = run_migrant(&root, &["taxonomy", "ls", "--json"]);
    assert_success(&listed);
    let listed = parse_json(&listed);
    let listed = listed.as_array().expect("taxonomies should be an array");
    assert_eq!(listed.len(), 2);
    assert!(listed
        .iter()
        .any(|taxonomy| taxonomy["name"] == "post_tag" && taxonomy["hierarchical"] == false));

    let csv = write_csv(&root, "categories.csv", "top;sub\nSports;Hockey\n");
    let imported = run_migrant(&root, &["import-terms", "category", "-f", &csv, "--json"]);
    assert_success(&imported);
    assert_eq!(parse_json(&imported)["created_count"], 2);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completions_print_without_opening_the_store() {
    let root = unique_workspace("migrant-cli-completions");
    let output = run_migrant(&root, &["completions", "bash"]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("migrant"));
    assert!(!root.join("site.sqlite").exists());
    let _ = std::fs::remove_dir_all(root);
}
