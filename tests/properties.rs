//! Property tests: compile determinism and interpolator channel packing.

use node_forge_shader_compiler::compile;
use node_forge_shader_compiler::dsl::ShaderGraph;
use proptest::prelude::*;

/// A graph with one Interpolator per requested width, every interpolated
/// value combined into the pixel output. Widths are realized through MixIn
/// nodes fed by scalar constants.
fn interpolator_graph(widths: &[u32]) -> ShaderGraph {
    const CHANNELS: [&str; 4] = ["X", "Y", "Z", "W"];

    let mut nodes = vec![
        serde_json::json!({"id": "vpos", "type": "VertexInput", "params": {"Semantic": "Position"}}),
        serde_json::json!({"id": "vout", "type": "VertexOutput"}),
        serde_json::json!({"id": "pout", "type": "PixelOutput"}),
    ];
    let mut connections = vec![serde_json::json!({
        "id": "cv",
        "from": {"nodeId": "vpos", "portId": "Output"},
        "to": {"nodeId": "vout", "portId": "Input"}
    })];
    let mut edge = |from: String, to: String, port: String| {
        let id = format!("c{}", connections.len());
        connections.push(serde_json::json!({
            "id": id,
            "from": {"nodeId": from, "portId": "Output"},
            "to": {"nodeId": to, "portId": port}
        }));
    };

    for (k, width) in widths.iter().enumerate() {
        for c in 0..*width as usize {
            let id = format!("s{k}_{c}");
            nodes.push(serde_json::json!({
                "id": id,
                "type": "Scalar",
                "params": {"Value": (k + c) as f64 * 0.25}
            }));
            edge(id, format!("mix{k}"), CHANNELS[c].to_string());
        }
        nodes.push(serde_json::json!({"id": format!("mix{k}"), "type": "MixIn"}));
        nodes.push(serde_json::json!({"id": format!("interp{k}"), "type": "Interpolator"}));
        edge(format!("mix{k}"), format!("interp{k}"), "Input".to_string());
    }

    // Fold every interpolated value into one expression for the pixel output.
    let mut acc = "interp0".to_string();
    for k in 1..widths.len() {
        let add = format!("acc{k}");
        nodes.push(serde_json::json!({"id": add, "type": "Add"}));
        edge(acc, format!("acc{k}"), "Input1".to_string());
        edge(format!("interp{k}"), format!("acc{k}"), "Input2".to_string());
        acc = format!("acc{k}");
    }
    edge(acc, "pout".to_string(), "Input".to_string());

    serde_json::from_value(serde_json::json!({
        "version": "1.0",
        "nodes": nodes,
        "connections": connections,
    }))
    .expect("generated graph json must deserialize")
}

/// Reference model of the first-fit channel allocator: extend the open
/// channel when the width fits, open a new one otherwise.
fn expected_channels(widths: &[u32]) -> u32 {
    let mut channels: Vec<u32> = Vec::new();
    for w in widths {
        match channels.last_mut() {
            Some(used) if *used + w <= 4 => *used += w,
            _ => channels.push(*w),
        }
    }
    channels.len() as u32
}

proptest! {
    #[test]
    fn interpolator_packing_matches_first_fit(
        widths in proptest::collection::vec(1u32..=4, 1..8)
    ) {
        let graph = interpolator_graph(&widths);
        let program = compile(&graph).unwrap();
        prop_assert_eq!(program.interpolator_channels, expected_channels(&widths));

        // Every allocated channel is declared exactly once per stage.
        for channel in 0..program.interpolator_channels {
            let decl = format!("float4 Attr{channel} : TEXCOORD{channel};");
            prop_assert_eq!(program.vertex_source.matches(&decl).count(), 1);
            prop_assert_eq!(program.pixel_source.matches(&decl).count(), 1);
        }
    }

    #[test]
    fn compilation_is_deterministic(
        widths in proptest::collection::vec(1u32..=4, 1..6)
    ) {
        let graph = interpolator_graph(&widths);
        let first = compile(&graph).unwrap();
        let second = compile(&graph).unwrap();
        prop_assert_eq!(first, second);
    }
}
