//! CLI tests.
//!
//! Run the `richtext` binary against files in a temporary directory.

#![cfg(feature = "cli")]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;

fn richtext(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_richtext"))
        .args(args)
        .env_remove("RICHTEXT_LOG")
        .output()
        .expect("failed to run richtext")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

// ============================================================================
// parse
// ============================================================================

#[test]
fn test_parse_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    fs::write(&input, "<p>Hello <b>world</b></p>").unwrap();

    let output = richtext(&["parse", path_str(&input)]);
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Hello " },
                    { "type": "text", "marks": [{ "type": "strong" }], "text": "world" },
                ],
            }],
        })
    );
}

#[test]
fn test_parse_to_file_pretty() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    let out = dir.path().join("out.json");
    fs::write(&input, "<h2>T</h2>").unwrap();

    let output = richtext(&["parse", path_str(&input), "-o", path_str(&out), "--pretty"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains('\n'));
    let value: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["content"][0]["attrs"]["level"], json!(2));
}

#[test]
fn test_parse_windows_1252_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    fs::write(&input, b"<p>caf\xE9</p>").unwrap();

    let output = richtext(&["parse", path_str(&input)]);
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["content"][0]["content"][0]["text"], json!("café"));
}

#[test]
fn test_parse_preserve_whitespace() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.html");
    fs::write(&input, "<p>a   b</p>").unwrap();

    let output = richtext(&["parse", path_str(&input), "--preserve-whitespace", "full"]);
    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["content"][0]["content"][0]["text"], json!("a   b"));
}

#[test]
fn test_parse_missing_file() {
    let dir = TempDir::new().unwrap();
    let output = richtext(&["parse", path_str(&dir.path().join("nope.html"))]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error:"));
}

// ============================================================================
// render and check
// ============================================================================

#[test]
fn test_render() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("doc.json");
    let doc = json!({
        "type": "doc",
        "content": [
            { "type": "ordered_list", "attrs": { "order": 2 }, "content": [
                { "type": "list_item", "content": [
                    { "type": "paragraph", "content": [{ "type": "text", "text": "x" }] },
                ] },
            ] },
            { "type": "horizontal_rule" },
        ],
    });
    fs::write(&input, doc.to_string()).unwrap();

    let output = richtext(&["render", path_str(&input)]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        r#"<ol start="2"><li><p>x</p></li></ol><hr>"#
    );
}

#[test]
fn test_check_valid_and_invalid() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    fs::write(
        &good,
        json!({ "type": "doc", "content": [{ "type": "paragraph" }] }).to_string(),
    )
    .unwrap();
    fs::write(
        &bad,
        json!({ "type": "doc", "content": [{ "type": "text", "text": "x" }] }).to_string(),
    )
    .unwrap();

    let output = richtext(&["check", path_str(&good)]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ok"));

    let output = richtext(&["check", path_str(&bad)]);
    assert!(!output.status.success());
}

#[test]
fn test_check_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("doc.json");
    fs::write(&input, "{ not json").unwrap();

    let output = richtext(&["check", path_str(&input)]);
    assert!(!output.status.success());
}

// ============================================================================
// schema
// ============================================================================

#[test]
fn test_schema_listing() {
    let output = richtext(&["schema"]);
    assert!(output.status.success());
    let listing = String::from_utf8_lossy(&output.stdout);
    for name in [
        "doc",
        "paragraph",
        "horizontal_rule",
        "heading",
        "hard_break",
        "ordered_list",
        "bullet_list",
        "list_item",
        "strong",
    ] {
        assert!(listing.contains(name), "missing {name}");
    }
    assert!(listing.contains("content=paragraph block*"));
}
