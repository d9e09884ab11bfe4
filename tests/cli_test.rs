//! CLI argument parsing and command dispatch.

use std::fs;

use clap::Parser;
use halberd::cli::{Command, HalberdArgs, OutputFormat, execute_command};
use serde_json::json;
use tempfile::TempDir;

fn parse(argv: &[&str]) -> HalberdArgs {
    HalberdArgs::try_parse_from(argv).unwrap()
}

#[test]
fn global_flags_after_subcommand() {
    let args = parse(&["halberd", "analyze", "Hello world", "--format", "json", "-q"]);
    assert_eq!(args.output_format, OutputFormat::Json);
    assert_eq!(args.verbosity(), 0);
    assert!(matches!(args.command, Command::Analyze(_)));
}

#[test]
fn unknown_command_is_rejected() {
    assert!(HalberdArgs::try_parse_from(["halberd", "index"]).is_err());
    assert!(HalberdArgs::try_parse_from(["halberd", "--format", "yaml", "analyze", "x"]).is_err());
}

#[test]
fn analyze_and_validate_run() {
    let dir = TempDir::new().unwrap();
    let request = dir.path().join("request.json");
    fs::write(
        &request,
        json!({"union": {"queries": [
            {"index": "a", "bool": {"all": [{"template": {"code": "{{ gt .price 10 }}"}}]}},
            {"index": "b", "scoreModifiers": {"functions": [{"code": "{{ mul .rank 2 }}"}]}}
        ]}})
        .to_string(),
    )
    .unwrap();
    let path = request.to_string_lossy().to_string();

    assert!(execute_command(parse(&["halberd", "-q", "validate", path.as_str()])).is_ok());
    assert!(execute_command(parse(&["halberd", "-q", "analyze", "--phrase", "Running dogs"])).is_ok());
}

#[test]
fn search_with_timeout_over_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("acme/config/index")).unwrap();
    fs::write(
        root.join("acme/config/index/notes.json"),
        json!({"fields": ["team"], "repoName": "notes"}).to_string(),
    )
    .unwrap();
    fs::create_dir_all(root.join("acme/notes/core")).unwrap();
    fs::write(root.join("acme/notes/core/1.json"), json!({"text": "hello"}).to_string()).unwrap();

    let request = root.join("request.json");
    fs::write(
        &request,
        json!({"query": {"index": "notes", "composite": {"team": "core"}}}).to_string(),
    )
    .unwrap();

    let root_arg = root.to_string_lossy().to_string();
    let request_arg = request.to_string_lossy().to_string();
    let args = parse(&[
        "halberd",
        "-q",
        "--format",
        "json",
        "search",
        "--root",
        root_arg.as_str(),
        "--owner",
        "acme",
        "--repo",
        "acme/config",
        "--timeout-ms",
        "5000",
        request_arg.as_str(),
    ]);
    assert!(execute_command(args).is_ok());
}
