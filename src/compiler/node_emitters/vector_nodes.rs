//! Emitters for the constructive nodes (MixIn, MatrixIn) and the matrix
//! Transform node.

use anyhow::{Result, bail};

use super::{declare_output, require_input};
use crate::compiler::context::Context;
use crate::compiler::types::{Stage, ValueType, cast_expr, cast_to_position};
use crate::dsl::Node;

/// MixIn combines scalar channel inputs into a vector. The widest connected
/// channel decides the output width; unconnected channels below it fill
/// with 0.0.
pub(crate) fn emit_mix_in(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    const CHANNELS: [&str; 4] = ["X", "Y", "Z", "W"];

    let mut components: Vec<Option<String>> = Vec::with_capacity(4);
    for pin in CHANNELS {
        match ctx.emit_input(node, pin, stage)? {
            Some(var) => {
                if var.ty != ValueType::Scalar {
                    bail!(
                        "{}: channel {pin} must be scalar, got {}",
                        node.node_type,
                        var.ty.hlsl()
                    );
                }
                components.push(Some(var.name));
            }
            None => components.push(None),
        }
    }

    let width = components
        .iter()
        .rposition(|c| c.is_some())
        .map(|i| i + 1)
        .unwrap_or(0);
    if width == 0 {
        bail!("{} missing input X", node.node_type);
    }

    if width == 1 {
        let expr = components[0].take().expect("channel X is connected");
        let out = ctx.emit_output(node, "Output", ValueType::Scalar, stage);
        ctx.shader_mut(stage)
            .stmt(format!("float {} = {expr};", out.name));
        return Ok(());
    }

    let ty = ValueType::with_width(width as u32)?;
    let parts: Vec<String> = components
        .into_iter()
        .take(width)
        .map(|c| c.unwrap_or_else(|| "0.0".to_string()))
        .collect();
    let expr = format!("{}({})", ty.hlsl(), parts.join(", "));
    declare_output(ctx, node, "Output", ty, &expr, stage);
    Ok(())
}

/// MatrixIn builds a matrix from four axis inputs. A missing axis defaults
/// to that row's identity basis vector (1.0 in the homogeneous slot for the
/// translation row).
pub(crate) fn emit_matrix_in(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    const AXES: [(&str, &str); 4] = [
        ("AxisX", "float4(1.0, 0.0, 0.0, 0.0)"),
        ("AxisY", "float4(0.0, 1.0, 0.0, 0.0)"),
        ("AxisZ", "float4(0.0, 0.0, 1.0, 0.0)"),
        ("AxisW", "float4(0.0, 0.0, 0.0, 1.0)"),
    ];

    let mut rows: Vec<String> = Vec::with_capacity(4);
    for (pin, identity) in AXES {
        match ctx.emit_input(node, pin, stage)? {
            Some(var) => {
                if !matches!(var.ty.width(), Some(1..=4)) {
                    bail!(
                        "{}: axis {pin} must be scalar or vector, got {}",
                        node.node_type,
                        var.ty.hlsl()
                    );
                }
                rows.push(cast_expr(&var.name, var.ty, ValueType::Vec4)?);
            }
            None => rows.push(identity.to_string()),
        }
    }

    let expr = format!("float4x4({})", rows.join(", "));
    declare_output(ctx, node, "Output", ValueType::Matrix4x4, &expr, stage);
    Ok(())
}

/// Transform is the sole consumer of matrix values: `mul(matrix, vector)`
/// with the vector widened to a homogeneous position.
pub(crate) fn emit_transform(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let matrix = require_input(ctx, node, "Matrix", stage)?;
    if matrix.ty != ValueType::Matrix4x4 {
        bail!(
            "{}: Matrix input must be a matrix, got {}",
            node.node_type,
            matrix.ty.hlsl()
        );
    }
    let vector = require_input(ctx, node, "Vector", stage)?;
    let ve = cast_to_position(&vector.name, vector.ty)?;
    let expr = format!("mul({}, {})", matrix.name, ve);
    declare_output(ctx, node, "Output", ValueType::Vec4, &expr, stage);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{test_connection, test_graph, test_node};
    use crate::compiler::context::Context;
    use crate::compiler::emit_node;
    use crate::compiler::types::{Stage, ValueType};

    #[test]
    fn mix_in_fills_unconnected_channels_with_zero() {
        let graph = test_graph(
            vec![
                test_node("x", "Scalar", serde_json::json!({"Value": 1.0})),
                test_node("z", "Scalar", serde_json::json!({"Value": 2.0})),
                test_node("mix", "MixIn", serde_json::json!({})),
            ],
            vec![
                test_connection("x", "Output", "mix", "X"),
                test_connection("z", "Output", "mix", "Z"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["mix"], Stage::Pixel).unwrap();
        let out = ctx
            .shader(Stage::Pixel)
            .cached_variable("mix", "Output")
            .unwrap();
        assert_eq!(out.ty, ValueType::Vec3);
        let src = ctx.shader(Stage::Pixel).generated_source();
        assert!(src.contains("float3(p0, 0.0, p1)"));
    }

    #[test]
    fn matrix_in_defaults_missing_axes_to_identity() {
        let graph = test_graph(
            vec![
                test_node(
                    "t",
                    "Vector3",
                    serde_json::json!({"X": 1.0, "Y": 2.0, "Z": 3.0}),
                ),
                test_node("m", "MatrixIn", serde_json::json!({})),
            ],
            vec![test_connection("t", "Output", "m", "AxisW")],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["m"], Stage::Vertex).unwrap();
        let src = ctx.shader(Stage::Vertex).generated_source();
        assert!(src.contains(
            "float4x4(float4(1.0, 0.0, 0.0, 0.0), float4(0.0, 1.0, 0.0, 0.0), \
             float4(0.0, 0.0, 1.0, 0.0), float4(v0, 0.0))"
        ));
    }

    #[test]
    fn transform_requires_a_matrix() {
        let graph = test_graph(
            vec![
                test_node("s", "Scalar", serde_json::json!({"Value": 1.0})),
                test_node(
                    "v",
                    "Vector3",
                    serde_json::json!({"X": 0.0, "Y": 0.0, "Z": 0.0}),
                ),
                test_node("xf", "Transform", serde_json::json!({})),
            ],
            vec![
                test_connection("s", "Output", "xf", "Matrix"),
                test_connection("v", "Output", "xf", "Vector"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        let err = emit_node(&mut ctx, &nodes["xf"], Stage::Vertex).unwrap_err();
        assert!(err.to_string().contains("Matrix input must be a matrix"));
    }

    #[test]
    fn transform_widens_vector_to_homogeneous_position() {
        let graph = test_graph(
            vec![
                test_node("m", "MatrixIn", serde_json::json!({})),
                test_node(
                    "v",
                    "Vector3",
                    serde_json::json!({"X": 1.0, "Y": 0.0, "Z": 0.0}),
                ),
                test_node("xf", "Transform", serde_json::json!({})),
            ],
            vec![
                test_connection("m", "Output", "xf", "Matrix"),
                test_connection("v", "Output", "xf", "Vector"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["xf"], Stage::Vertex).unwrap();
        let src = ctx.shader(Stage::Vertex).generated_source();
        assert!(src.contains("mul(v0, float4(v1, 1.0))"));
    }
}
