//! End-to-end pipeline tests: classification, loading, processing, dispatch

use std::io::Cursor;
use std::path::PathBuf;

use tempfile::TempDir;

use schemaview::cli::args::Cli;
use schemaview::cli::commands::execute;
use schemaview::cli::error::CliError;
use schemaview::config::Settings;
use schemaview::format::builtin_registry;
use schemaview::util::testing;

fn create_schema_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write schema file");
    path
}

fn cli(args: Vec<String>, format: Option<&str>, path: Vec<String>) -> Cli {
    Cli {
        args,
        path,
        format: format.map(str::to_string),
        trace: None,
        debug: 0,
        completions: None,
    }
}

/// Run one pipeline invocation with captured stdin/stdout.
fn run(cli: &Cli, stdin: &str) -> (Result<(), CliError>, String) {
    testing::init_test_setup();
    let registry = builtin_registry();
    let settings = Settings::default();
    let mut input = Cursor::new(stdin.to_string());
    let mut output = Vec::new();
    let result = execute(cli, &settings, &registry, &mut input, &mut output);
    (result, String::from_utf8(output).expect("utf8 output"))
}

const ALPHA: &str = r#"module alpha {
    namespace "urn:alpha";
    prefix al;
    container settings {
        leaf name { type string; }
        leaf-list tags { type string; }
    }
}"#;

const ZETA: &str = r#"module zeta {
    namespace "urn:zeta";
    prefix zt;
    leaf serial { type uint32; }
}"#;

#[test]
fn given_files_in_any_order_when_running_then_output_is_name_sorted() {
    let temp = TempDir::new().unwrap();
    let alpha = create_schema_file(&temp, "alpha.sdl", ALPHA);
    let zeta = create_schema_file(&temp, "zeta.sdl", ZETA);

    let forward = cli(
        vec![alpha.display().to_string(), zeta.display().to_string()],
        None,
        vec![],
    );
    let reverse = cli(
        vec![zeta.display().to_string(), alpha.display().to_string()],
        None,
        vec![],
    );

    let (result_fwd, out_fwd) = run(&forward, "");
    let (result_rev, out_rev) = run(&reverse, "");

    assert!(result_fwd.is_ok());
    assert!(result_rev.is_ok());
    assert_eq!(out_fwd, out_rev, "output must not depend on input order");
    let alpha_pos = out_fwd.find("module: alpha").unwrap();
    let zeta_pos = out_fwd.find("module: zeta").unwrap();
    assert!(alpha_pos < zeta_pos);
}

#[test]
fn given_same_invocation_twice_when_running_then_output_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let alpha = create_schema_file(&temp, "alpha.sdl", ALPHA);

    let invocation = cli(vec![alpha.display().to_string()], None, vec![]);
    let (_, first) = run(&invocation, "");
    let (_, second) = run(&invocation, "");

    assert_eq!(first, second);
}

#[test]
fn given_duplicate_module_name_when_running_then_one_tree_is_emitted() {
    let temp = TempDir::new().unwrap();
    let first = create_schema_file(&temp, "first.sdl", ZETA);
    let second = create_schema_file(
        &temp,
        "second.sdl",
        r#"module zeta {
            namespace "urn:zeta2";
            prefix z2;
            leaf other { type string; }
        }"#,
    );

    let invocation = cli(
        vec![first.display().to_string(), second.display().to_string()],
        None,
        vec![],
    );
    let (result, out) = run(&invocation, "");

    assert!(result.is_ok());
    assert_eq!(out.matches("module: zeta").count(), 1);
    // first-loaded definition wins
    assert!(out.contains("serial"));
    assert!(!out.contains("other"));
}

#[test]
fn given_unregistered_format_when_running_then_choices_are_listed_sorted() {
    let invocation = cli(vec![], Some("bogus"), vec![]);
    let (result, out) = run(&invocation, "");

    assert!(out.is_empty(), "no output on a fatal condition");
    match result {
        Err(CliError::InvalidFormat { requested, choices }) => {
            assert_eq!(requested, "bogus");
            assert_eq!(choices, "json, tree, types");
        }
        other => panic!("expected InvalidFormat, got {other:?}"),
    }
}

#[test]
fn given_one_malformed_file_when_running_then_valid_files_still_render() {
    let temp = TempDir::new().unwrap();
    let broken = create_schema_file(&temp, "broken.sdl", "module broken {");
    let alpha = create_schema_file(&temp, "alpha.sdl", ALPHA);

    let invocation = cli(
        vec![broken.display().to_string(), alpha.display().to_string()],
        None,
        vec![],
    );
    let (result, out) = run(&invocation, "");

    assert!(result.is_ok(), "partial failure must not abort: {result:?}");
    assert!(out.contains("module: alpha"));
    assert!(!out.contains("broken"));
}

#[test]
fn given_malformed_stdin_when_running_then_run_aborts_without_output() {
    let invocation = cli(vec![], None, vec![]);
    let (result, out) = run(&invocation, "module broken {");

    assert!(matches!(result, Err(CliError::Schema(_))));
    assert!(out.is_empty());
}

#[test]
fn given_valid_stdin_when_running_then_tree_is_rendered() {
    let invocation = cli(vec![], None, vec![]);
    let (result, out) = run(&invocation, ALPHA);

    assert!(result.is_ok());
    assert!(out.contains("module: alpha"));
    assert!(out.contains("name (string)"));
    assert!(out.contains("tags* (string)"));
}

#[test]
fn given_module_name_with_aux_file_when_running_then_no_fallback_is_needed() {
    let temp = TempDir::new().unwrap();
    let alpha = create_schema_file(&temp, "alpha.sdl", ALPHA);

    let invocation = cli(
        vec!["alpha".to_string(), alpha.display().to_string()],
        None,
        vec![],
    );
    let (result, out) = run(&invocation, "");

    assert!(result.is_ok(), "named module should resolve: {result:?}");
    assert!(out.contains("module: alpha"));
}

#[test]
fn given_module_name_only_when_running_then_fallback_file_is_consulted() {
    let temp = TempDir::new().unwrap();
    create_schema_file(&temp, "MODULES.sdl", ALPHA);

    let invocation = cli(
        vec!["alpha".to_string()],
        None,
        vec![temp.path().display().to_string()],
    );
    let (result, out) = run(&invocation, "");

    assert!(result.is_ok(), "fallback should resolve: {result:?}");
    assert!(out.contains("module: alpha"));
}

#[test]
fn given_unresolvable_module_name_when_running_then_not_found_is_terminal() {
    let temp = TempDir::new().unwrap();

    let invocation = cli(
        vec!["ghost".to_string()],
        None,
        vec![temp.path().display().to_string()],
    );
    let (result, out) = run(&invocation, "");

    assert!(out.is_empty());
    match result {
        Err(CliError::Batch(errors)) => {
            assert!(errors
                .iter()
                .any(|e| e.to_string().contains("module not found: ghost")));
        }
        other => panic!("expected error batch, got {other:?}"),
    }
}

#[test]
fn given_processing_errors_when_running_then_batch_is_terminal_and_complete() {
    let temp = TempDir::new().unwrap();
    let bad = create_schema_file(
        &temp,
        "bad.sdl",
        r#"module bad {
            namespace "urn:bad";
            prefix bd;
            leaf x { type nonsense; }
            leaf y { type missing-too; }
        }"#,
    );

    let invocation = cli(vec![bad.display().to_string()], None, vec![]);
    let (result, out) = run(&invocation, "");

    assert!(out.is_empty(), "no output once processing failed");
    match result {
        Err(CliError::Batch(errors)) => {
            assert_eq!(errors.len(), 2, "every error is reported: {errors:?}");
            // one diagnostic per line when displayed
            let rendered = CliError::Batch(errors).to_string();
            assert_eq!(rendered.lines().count(), 2);
        }
        other => panic!("expected error batch, got {other:?}"),
    }
}

#[test]
fn given_json_format_when_running_then_output_is_valid_json() {
    let invocation = cli(vec![], Some("json"), vec![]);
    let (result, out) = run(&invocation, ALPHA);

    assert!(result.is_ok());
    let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
    assert_eq!(value[0]["name"], "alpha");
    assert_eq!(value[0]["kind"], "module");
}

#[test]
fn given_types_format_when_running_then_leaf_paths_are_listed() {
    let invocation = cli(vec![], Some("types"), vec![]);
    let (result, out) = run(&invocation, ALPHA);

    assert!(result.is_ok());
    assert!(out.contains("/alpha/settings/name string"));
    assert!(out.contains("/alpha/settings/tags string"));
    assert!(out.contains("1 distinct types: string"));
}

#[test]
fn given_format_from_settings_when_running_then_cli_flag_still_overrides() {
    let settings = Settings {
        format: Some("types".to_string()),
        ..Settings::default()
    };

    let registry = builtin_registry();
    let invocation = cli(vec![], Some("json"), vec![]);
    let mut input = Cursor::new(ALPHA.to_string());
    let mut output = Vec::new();
    let result = execute(&invocation, &settings, &registry, &mut input, &mut output);

    assert!(result.is_ok());
    let out = String::from_utf8(output).unwrap();
    assert!(out.trim_start().starts_with('['), "json output expected");
}
