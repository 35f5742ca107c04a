//! Export format compliance tests
//!
//! The heap snapshot JSON schema is a compatibility surface: the key
//! names and nesting verified here must not change.

use std::io::Read;
use std::sync::Arc;

use profiling_api::{ProfilingSession, SimulatedEngine};

fn snapshot_json() -> serde_json::Value {
    let engine = Arc::new(SimulatedEngine::new());
    let session = ProfilingSession::new(engine.clone());
    engine.allocate_object("compliance widget", 2048);
    let snapshot = session.heap().take_snapshot(Some("compliance")).unwrap();
    serde_json::from_str(&snapshot.export_json().unwrap()).unwrap()
}

#[test]
fn test_top_level_key_set() {
    let value = snapshot_json();
    for key in ["snapshot", "nodes", "edges", "samples", "strings"] {
        assert!(value.get(key).is_some(), "missing top-level key {key}");
    }
}

#[test]
fn test_snapshot_meta_nesting() {
    let value = snapshot_json();
    let snapshot = &value["snapshot"];
    assert!(snapshot["node_count"].is_u64());
    assert!(snapshot["edge_count"].is_u64());

    let meta = &snapshot["meta"];
    for key in [
        "node_fields",
        "node_types",
        "edge_fields",
        "edge_types",
        "sample_fields",
    ] {
        assert!(meta.get(key).is_some(), "missing meta key {key}");
    }
    assert_eq!(
        meta["node_fields"],
        serde_json::json!(["type", "name", "id", "self_size", "edge_count"])
    );
    assert_eq!(
        meta["edge_fields"],
        serde_json::json!(["type", "name_or_index", "to_node"])
    );
}

#[test]
fn test_flat_tables_match_counts() {
    let value = snapshot_json();
    let node_count = value["snapshot"]["node_count"].as_u64().unwrap() as usize;
    let edge_count = value["snapshot"]["edge_count"].as_u64().unwrap() as usize;
    let node_fields = value["snapshot"]["meta"]["node_fields"].as_array().unwrap();
    let edge_fields = value["snapshot"]["meta"]["edge_fields"].as_array().unwrap();

    assert_eq!(
        value["nodes"].as_array().unwrap().len(),
        node_count * node_fields.len()
    );
    assert_eq!(
        value["edges"].as_array().unwrap().len(),
        edge_count * edge_fields.len()
    );
}

#[test]
fn test_edge_targets_are_node_offsets() {
    let value = snapshot_json();
    let node_fields_len = value["snapshot"]["meta"]["node_fields"]
        .as_array()
        .unwrap()
        .len() as u64;
    let node_count = value["snapshot"]["node_count"].as_u64().unwrap();
    let edges = value["edges"].as_array().unwrap();

    for to_node in edges.iter().skip(2).step_by(3) {
        let offset = to_node.as_u64().unwrap();
        assert_eq!(offset % node_fields_len, 0);
        assert!(offset / node_fields_len < node_count);
    }
}

#[test]
fn test_chunked_complete_and_stream_modes_agree() {
    let engine = Arc::new(SimulatedEngine::new());
    let session = ProfilingSession::new(engine.clone());
    for index in 0..100 {
        engine.allocate_object(&format!("object {index}"), 64 + index);
    }
    let snapshot = session.heap().take_snapshot(None).unwrap();

    let complete = snapshot.export_json().unwrap();

    let mut chunked = String::new();
    let mut done = 0;
    snapshot
        .serialize(|chunk| chunked.push_str(chunk), || done += 1)
        .unwrap();
    assert_eq!(done, 1);
    assert_eq!(chunked, complete);

    let mut streamed = String::new();
    snapshot
        .export_stream()
        .unwrap()
        .read_to_string(&mut streamed)
        .unwrap();
    assert_eq!(streamed, complete);
}

#[test]
fn test_cpu_profile_export_parses() {
    let engine = Arc::new(SimulatedEngine::new());
    let session = ProfilingSession::new(engine);
    session.cpu().start(Some("compliance"), false).unwrap();
    let profile = session.cpu().stop().unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&profile.export_json().unwrap()).unwrap();
    assert_eq!(value["title"], "compliance");
    assert!(value["root"]["children"].is_array());
    // Samples were not requested, so the key is absent
    assert!(value.get("samples").is_none());
}

#[test]
fn test_sampling_profile_export_shape() {
    let engine = Arc::new(SimulatedEngine::new());
    let session = ProfilingSession::new(engine.clone());
    session.allocation_sampling().start(None).unwrap();
    let profile = session.allocation_sampling().stop().unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&profile.export_json().unwrap()).unwrap();
    let head = &value["head"];
    for key in [
        "functionName",
        "scriptId",
        "url",
        "lineNumber",
        "columnNumber",
        "selfSize",
        "children",
    ] {
        assert!(head.get(key).is_some(), "missing head key {key}");
    }
}
