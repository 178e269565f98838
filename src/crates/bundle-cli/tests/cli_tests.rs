//! Integration tests for bundlectl
//!
//! These tests run the compiled binary against descriptor files written to a
//! temporary directory.

use bundle_graph::descriptor::{BundleDescriptor, CoderSpec, PTransform};
use bundle_graph::payload::{encode_fn, encode_port, DecodedFn, InboundDecl};
use bundle_graph::{urn, FullType, InputKind, Opcode, UserFn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn create_test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

fn pardo(name: &str) -> Vec<u8> {
    encode_fn(&DecodedFn {
        opcode: Opcode::ParDo,
        function: UserFn {
            name: name.to_string(),
            payload: vec![],
        },
        inbound: vec![InboundDecl {
            kind: InputKind::Main,
            element_type: FullType::Bytes,
        }],
        outbound: vec![FullType::String],
    })
}

fn spk() -> BundleDescriptor {
    BundleDescriptor::builder("spk")
        .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
        .coder("str", CoderSpec::new(urn::CODER_STRING_UTF8))
        .pcollection("pc_s", "bytes")
        .pcollection("pc_p", "str")
        .transform(
            "S",
            PTransform::new(urn::DATA_SOURCE, encode_port("localhost:50000"))
                .with_output("o", "pc_s"),
        )
        .transform(
            "P",
            PTransform::new(urn::LEGACY_DOFN, pardo("parse"))
                .with_input("i", "pc_s")
                .with_output("r", "pc_p"),
        )
        .transform(
            "K",
            PTransform::new(urn::DATA_SINK, encode_port("localhost:50000"))
                .with_input("i", "pc_p"),
        )
        .build()
}

fn cyclic() -> BundleDescriptor {
    BundleDescriptor::builder("loop")
        .coder("bytes", CoderSpec::new(urn::CODER_BYTES))
        .pcollection("pc_a", "bytes")
        .pcollection("pc_b", "bytes")
        .transform(
            "A",
            PTransform::new(urn::LEGACY_DOFN, pardo("a"))
                .with_input("i", "pc_b")
                .with_output("o", "pc_a"),
        )
        .transform(
            "B",
            PTransform::new(urn::LEGACY_DOFN, pardo("b"))
                .with_input("i", "pc_a")
                .with_output("o", "pc_b"),
        )
        .build()
}

fn write_yaml(dir: &Path, name: &str, descriptor: &BundleDescriptor) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, descriptor.to_yaml().unwrap()).expect("Failed to write YAML file");
    path
}

fn bundlectl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bundlectl"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run bundlectl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_check_valid_bundle() {
    let dir = create_test_dir();
    let file = write_yaml(dir.path(), "spk.yaml", &spk());

    let output = bundlectl(&["check", file.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("✓ Bundle 'spk' translates"));
    assert!(out.contains("Nodes: 2"));
    assert!(out.contains("Edges: 3"));
}

#[test]
fn test_check_cyclic_bundle_fails() {
    let dir = create_test_dir();
    let file = write_yaml(dir.path(), "loop.yaml", &cyclic());

    let output = bundlectl(&["check", file.to_str().unwrap()]);
    assert!(!output.status.success());

    let err = stderr(&output);
    assert!(err.contains("bundle 'loop' failed to translate"));
    assert!(err.contains("bundle contained a cycle"));
}

#[test]
fn test_sort_prints_order_and_producers() {
    let dir = create_test_dir();
    let file = write_yaml(dir.path(), "spk.yml", &spk());

    let output = bundlectl(&["sort", file.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Order (3):\n  1. S\n  2. P\n  3. K\n"));
    assert!(out.contains("pc_p <- P"));
    assert!(out.contains("pc_s <- S"));
}

#[test]
fn test_translate_prints_summary_json() {
    let dir = create_test_dir();
    let file = dir.path().join("spk.json");
    fs::write(&file, spk().to_json_pretty().unwrap()).unwrap();

    let output = bundlectl(&["translate", file.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["nodes"], 2);
    assert_eq!(summary["edges"], 3);
    assert_eq!(summary["order"], serde_json::json!(["S", "P", "K"]));
    assert_eq!(summary["root_transforms"], serde_json::json!(["S"]));
    assert_eq!(summary["node_types"]["n1"], "string@global");
}

#[test]
fn test_render_formats() {
    let dir = create_test_dir();
    let file = write_yaml(dir.path(), "spk.yaml", &spk());
    let path = file.to_str().unwrap();

    let dot = bundlectl(&["render", path, "--format", "dot"]);
    assert!(dot.status.success(), "stderr: {}", stderr(&dot));
    let dot = stdout(&dot);
    assert!(dot.starts_with("digraph G {"));
    assert!(dot.contains("label=\"spk\";"));

    let mermaid = bundlectl(&["render", path, "--format", "mermaid", "--details"]);
    let mermaid = stdout(&mermaid);
    assert!(mermaid.starts_with("graph TD"));
    assert!(mermaid.contains("fn: parse"));

    let ascii = bundlectl(&["render", path, "--title", "Pipeline"]);
    let ascii = stdout(&ascii);
    assert!(ascii.starts_with("Pipeline:"));
    assert!(ascii.contains("[e1] ParDo P"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = create_test_dir();
    let config = dir.path().join("translate.toml");
    fs::write(&config, "consumer_lookup = \"scan\"\nplaceholder_output = \"r\"\n").unwrap();
    let file = write_yaml(dir.path(), "spk.yaml", &spk());

    // With "r" as the placeholder, P's only output disappears.
    let output = bundlectl(&[
        "--config",
        config.to_str().unwrap(),
        "check",
        file.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unexpected number of outputs: 0, want 1"));
}

#[test]
fn test_missing_file() {
    let output = bundlectl(&["check", "/nonexistent/bundle.yaml"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to load descriptor"));
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let dir = create_test_dir();
    let file = write_yaml(dir.path(), "spk.yaml", &spk());

    let output = bundlectl(&["--log-level", "debug", "check", file.to_str().unwrap()]);
    assert!(output.status.success());
    let err = stderr(&output);
    assert!(err.contains("translated transform"));
    for kind in ["DataSource", "ParDo", "DataSink"] {
        assert!(err.contains(kind), "missing edge kind {} in: {}", kind, err);
    }
    assert!(!stdout(&output).contains("translated transform"));
}
