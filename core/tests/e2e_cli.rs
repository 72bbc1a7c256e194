//! End-to-end CLI tests for the `tsa` binary.
//!
//! Grounded on the teacher's `tests/e2e_cli.rs`: drive the compiled binary
//! with `assert_cmd` against throwaway fixture projects and assert on its
//! JSON stdout, rather than calling `EngineContext` in-process (that's
//! covered by the unit tests beside `engine.rs`).

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn tsa() -> Command {
    cargo_bin_cmd!("tsa")
}

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = tsa()
        .current_dir(dir)
        .arg("--project")
        .arg(dir)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("stdout should be valid JSON")
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        tsa()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("find-references"))
            .stdout(predicate::str::contains("function-details"))
            .stdout(predicate::str::contains("call-graph"));
    }

    #[test]
    fn shows_version() {
        tsa()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod find_references {
    use super::*;

    #[test]
    fn finds_declaration_import_and_call_across_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.ts", "export class User {}\n");
        write(
            dir.path(),
            "b.ts",
            "import { User } from './a';\nnew User();\n",
        );

        let json = run_json(
            dir.path(),
            &[
                "find-references",
                "User",
                "--resolution-depth",
                "semantic",
                "--include-confidence-scores",
            ],
        );

        assert_eq!(json["total_references"], 3);
        let files: Vec<&str> = json["references"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["file"].as_str().unwrap())
            .collect();
        assert!(files.iter().any(|f| f.ends_with("a.ts")));
        assert!(files.iter().any(|f| f.ends_with("b.ts")));
    }

    #[test]
    fn reports_zero_references_for_unknown_symbol() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.ts", "export const x = 1;\n");

        let json = run_json(dir.path(), &["find-references", "NoSuchSymbol"]);
        assert_eq!(json["total_references"], 0);
        assert_eq!(json["success"], false);
    }
}

mod function_details {
    use super::*;

    #[test]
    fn extracts_signature_and_parameters() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "math.ts",
            "export function add(a: number, b: number): number {\n  return a + b;\n}\n",
        );

        let json = run_json(dir.path(), &["function-details", "add"]);
        let matches = json["details"]["add"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["parameters"].as_array().unwrap().len(), 2);
    }
}

mod call_graph {
    use super::*;

    #[test]
    fn traces_recursive_calls_and_reports_cycles() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "x.ts",
            "function a() { a(); b(); }\nfunction b() { a(); }\n",
        );
        let file = dir.path().join("x.ts");

        let json = run_json(
            dir.path(),
            &[
                "call-graph",
                "a",
                "--file",
                file.to_str().unwrap(),
                "--max-depth",
                "5",
            ],
        );

        assert_eq!(json["entry_point"], "a");
        assert!(json["call_graph_stats"]["cycles_detected"].as_u64().unwrap() >= 1);
    }

    #[test]
    fn reports_not_found_for_missing_entry_point() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x.ts", "function a() {}\n");
        let file = dir.path().join("x.ts");

        let json = run_json(
            dir.path(),
            &["call-graph", "missing", "--file", file.to_str().unwrap()],
        );
        let errors = json["errors"].as_array().unwrap();
        assert!(errors.iter().any(|e| e["code"] == "NOT_FOUND"));
    }
}

mod incremental {
    use super::*;

    #[test]
    fn reports_no_changes_on_a_clean_project() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.ts", "export const x = 1;\n");

        let json = run_json(dir.path(), &["incremental"]);
        assert!(json.get("modified").is_some() || json.get("files_analyzed").is_some());
    }
}
