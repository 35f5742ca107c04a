//! Snapshot document schema metadata
//!
//! The key names and field layouts here are a compatibility surface:
//! generic snapshot readers interpret the flat `nodes`/`edges`/`samples`
//! arrays through `snapshot.meta` without hardcoded offsets.

use profile_types::{HeapEdgeType, HeapGraph, HeapNodeType};

/// Field layout of one node record
pub const NODE_FIELDS: [&str; 5] = ["type", "name", "id", "self_size", "edge_count"];

/// Field layout of one edge record
pub const EDGE_FIELDS: [&str; 3] = ["type", "name_or_index", "to_node"];

/// Field layout of one sample record
pub const SAMPLE_FIELDS: [&str; 2] = ["timestamp_us", "last_assigned_id"];

fn json_string_array(items: &[&str]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| serde_json::Value::from(*item).to_string())
        .collect();
    format!("[{}]", quoted.join(","))
}

/// The opening section of the document, through `"nodes":[`
pub(crate) fn document_header(graph: &HeapGraph) -> String {
    let node_type_names: Vec<&str> = HeapNodeType::ALL.iter().map(|t| t.as_str()).collect();
    let edge_type_names: Vec<&str> = HeapEdgeType::ALL.iter().map(|t| t.as_str()).collect();

    format!(
        concat!(
            "{{\"snapshot\":{{",
            "\"meta\":{{",
            "\"node_fields\":{node_fields},",
            "\"node_types\":[{node_types},\"string\",\"number\",\"number\",\"number\"],",
            "\"edge_fields\":{edge_fields},",
            "\"edge_types\":[{edge_types},\"string_or_number\",\"node\"],",
            "\"sample_fields\":{sample_fields}",
            "}},",
            "\"node_count\":{node_count},",
            "\"edge_count\":{edge_count}",
            "}},",
            "\"nodes\":["
        ),
        node_fields = json_string_array(&NODE_FIELDS),
        node_types = json_string_array(&node_type_names),
        edge_fields = json_string_array(&EDGE_FIELDS),
        edge_types = json_string_array(&edge_type_names),
        sample_fields = json_string_array(&SAMPLE_FIELDS),
        node_count = graph.nodes.len(),
        edge_count = graph.edges.len(),
    )
}
