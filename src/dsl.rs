use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// A shader graph as exported by the editor.
///
/// The graph arriving here is already validated upstream (acyclic, one
/// pixel-output and one vertex-output node, type permutations resolved); the
/// compiler consumes it read-only.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShaderGraph {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Literal parameters (constant values, comparison modes, loop bounds,
    /// uniform names, filter modes, ...). Permissive JSON, normalized through
    /// the `parse_*` accessors below.
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

impl ShaderGraph {
    pub fn nodes_by_id(&self) -> HashMap<String, Node> {
        self.nodes
            .iter()
            .cloned()
            .map(|n| (n.id.clone(), n))
            .collect()
    }

    /// All nodes of the given kind string, in graph order.
    pub fn find_nodes_of(&self, node_type: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .collect()
    }
}

pub fn load_graph_from_path(path: impl AsRef<std::path::Path>) -> Result<ShaderGraph> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    serde_json::from_str(&text).context("failed to parse graph json")
}

pub fn find_node<'a>(nodes_by_id: &'a HashMap<String, Node>, node_id: &str) -> Result<&'a Node> {
    nodes_by_id
        .get(node_id)
        .ok_or_else(|| anyhow!("node not found: {node_id}"))
}

/// The connection feeding `to_port_id` on `to_node_id`, if any.
///
/// Input pins accept at most one edge; the validator rejects fan-in, so the
/// first match is the only match.
pub fn incoming_connection<'a>(
    graph: &'a ShaderGraph,
    to_node_id: &str,
    to_port_id: &str,
) -> Option<&'a Connection> {
    graph
        .connections
        .iter()
        .find(|c| c.to.node_id == to_node_id && c.to.port_id == to_port_id)
}

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_i64(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<i64> {
    match params.get(key) {
        Some(v) => v.as_i64().or_else(|| {
            v.as_f64()
                .filter(|x| x.is_finite())
                .map(|x| x.floor() as i64)
        }),
        None => None,
    }
}

pub fn parse_u32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn parse_bool(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}
