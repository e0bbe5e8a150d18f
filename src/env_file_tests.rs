// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `env_file.rs`

use super::*;
use std::io::Write;

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_parse_simple_pairs() {
    let parsed = parse_env("FOO=bar\nBAZ=qux\n").unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "bar"), ("BAZ", "qux")]));
}

#[test]
fn test_blank_lines_and_comments_are_ignored() {
    let parsed = parse_env("# leading comment\n\n   \nFOO=bar\n  # indented comment\n").unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "bar")]));
}

#[test]
fn test_double_quoted_value_expands_newlines() {
    let parsed = parse_env(r#"FOO="bar\nbaz""#).unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "bar\nbaz")]));
}

#[test]
fn test_single_quoted_value_is_literal() {
    let parsed = parse_env(r"FOO='bar\nbaz'").unwrap();
    assert_eq!(parsed[0].1, "bar\\nbaz");
    assert_eq!(parsed[0].1.len(), 8);
}

#[test]
fn test_unquoted_values_are_trimmed() {
    let parsed = parse_env("FOO =   spaced out   \n").unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "spaced out")]));
}

#[test]
fn test_value_may_contain_equals_and_be_empty() {
    let parsed = parse_env("URL=postgres://u:p@h/db?sslmode=require\nEMPTY=\n").unwrap();
    assert_eq!(
        parsed,
        pairs(&[
            ("URL", "postgres://u:p@h/db?sslmode=require"),
            ("EMPTY", "")
        ])
    );
}

#[test]
fn test_export_prefix_is_accepted() {
    let parsed = parse_env("export FOO=bar").unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "bar")]));
}

#[test]
fn test_duplicates_are_kept_in_order() {
    let parsed = parse_env("FOO=first\nFOO=second\n").unwrap();
    assert_eq!(parsed, pairs(&[("FOO", "first"), ("FOO", "second")]));
}

#[test]
fn test_malformed_line_names_line_number() {
    let err = parse_env("FOO=bar\n\nnot a pair\n").unwrap_err();
    match err {
        EnvFileError::MalformedLine { line_number, line } => {
            assert_eq!(line_number, 3);
            assert_eq!(line, "not a pair");
        }
        other => panic!("expected MalformedLine, got {other:?}"),
    }
}

#[test]
fn test_empty_key_is_malformed() {
    let err = parse_env("=value").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Malformed line 1 in env file: '=value'"
    );
}

#[test]
fn test_read_env_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# settings").unwrap();
    writeln!(file, "LOG_LEVEL=debug").unwrap();
    writeln!(file, "GREETING=\"hello\\nworld\"").unwrap();

    let parsed = read_env_file(file.path()).unwrap();
    assert_eq!(
        parsed,
        pairs(&[("LOG_LEVEL", "debug"), ("GREETING", "hello\nworld")])
    );
}

#[test]
fn test_read_missing_env_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_env_file(&dir.path().join("missing.env")).unwrap_err();
    assert!(matches!(err, EnvFileError::Io { .. }));
}
