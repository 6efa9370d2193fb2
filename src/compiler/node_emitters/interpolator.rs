//! The stage-crossing primitive.
//!
//! An Interpolator reached during pixel emission emits its input subtree in
//! the vertex stage, stores the result into an interpolator channel, and
//! binds its pixel-side output to the channel read. Reached during vertex
//! emission it is a plain pass-through, since no stage boundary is crossed.

use anyhow::{Result, anyhow};

use super::require_input;
use crate::compiler::context::Context;
use crate::compiler::shader::Section;
use crate::compiler::types::Stage;
use crate::dsl::Node;

pub(crate) fn emit_interpolator(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    if stage == Stage::Vertex {
        let value = require_input(ctx, node, "Input", Stage::Vertex)?;
        ctx.shader_mut(Stage::Vertex)
            .create_outer_variable(&node.id, "Output", value.name, value.ty);
        return Ok(());
    }

    let value = require_input(ctx, node, "Input", Stage::Vertex)?;
    let width = value
        .ty
        .width()
        .filter(|w| (1..=4).contains(w))
        .ok_or_else(|| {
            anyhow!(
                "{}: cannot interpolate a {} value",
                node.node_type,
                value.ty.hlsl()
            )
        })?;

    let (channel, offset, first_use) = ctx.allocate_interpolator(width);
    // The channel is declared 4-wide once; narrower values address their
    // packed components through a swizzle.
    let mask = &"xyzw"[offset as usize..(offset + width) as usize];

    if first_use {
        let decl = format!("    float4 Attr{channel} : TEXCOORD{channel};");
        ctx.shader_mut(Stage::Vertex).line(Section::Output, &decl);
        ctx.shader_mut(Stage::Pixel)
            .add_input(&format!("Attr{channel}"), &decl);
    }

    let (store, read) = if width == 4 {
        (format!("o.Attr{channel}"), format!("i.Attr{channel}"))
    } else {
        (
            format!("o.Attr{channel}.{mask}"),
            format!("i.Attr{channel}.{mask}"),
        )
    };
    ctx.shader_mut(Stage::Vertex)
        .stmt(format!("{store} = {};", value.name));
    ctx.shader_mut(Stage::Pixel)
        .create_outer_variable(&node.id, "Output", read, value.ty);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{test_connection, test_graph, test_node};
    use crate::compiler::context::Context;
    use crate::compiler::emit_node;
    use crate::compiler::types::Stage;

    #[test]
    fn pixel_request_crosses_the_stage_boundary() {
        let graph = test_graph(
            vec![
                test_node("pos", "VertexInput", serde_json::json!({"Semantic": "Position"})),
                test_node("interp", "Interpolator", serde_json::json!({})),
            ],
            vec![test_connection("pos", "Output", "interp", "Input")],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["interp"], Stage::Pixel).unwrap();

        let vs = ctx.shader(Stage::Vertex).generated_source();
        assert!(vs.contains("float4 Attr0 : TEXCOORD0;"));
        assert!(vs.contains("o.Attr0.xyz = i.Position;"));

        let read = ctx
            .shader(Stage::Pixel)
            .cached_variable("interp", "Output")
            .unwrap();
        assert_eq!(read.name, "i.Attr0.xyz");
        let ps = ctx.shader(Stage::Pixel).generated_source();
        assert!(ps.contains("float4 Attr0 : TEXCOORD0;"));
    }

    #[test]
    fn narrow_values_pack_into_one_channel() {
        let graph = test_graph(
            vec![
                test_node("uv", "VertexInput", serde_json::json!({"Semantic": "TexCoord0"})),
                test_node("uv2", "VertexInput", serde_json::json!({"Semantic": "TexCoord1"})),
                test_node("i1", "Interpolator", serde_json::json!({})),
                test_node("i2", "Interpolator", serde_json::json!({})),
            ],
            vec![
                test_connection("uv", "Output", "i1", "Input"),
                test_connection("uv2", "Output", "i2", "Input"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["i1"], Stage::Pixel).unwrap();
        emit_node(&mut ctx, &nodes["i2"], Stage::Pixel).unwrap();

        let vs = ctx.shader(Stage::Vertex).generated_source();
        assert!(vs.contains("o.Attr0.xy = i.TexCoord0;"));
        assert!(vs.contains("o.Attr0.zw = i.TexCoord1;"));
        // One channel, declared once per stage.
        assert_eq!(vs.matches("TEXCOORD0;").count(), 2); // input + output structs
        assert_eq!(ctx.interpolator_channel_count(), 1);
    }

    #[test]
    fn vertex_request_is_a_pass_through() {
        let graph = test_graph(
            vec![
                test_node("pos", "VertexInput", serde_json::json!({"Semantic": "Position"})),
                test_node("interp", "Interpolator", serde_json::json!({})),
            ],
            vec![test_connection("pos", "Output", "interp", "Input")],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["interp"], Stage::Vertex).unwrap();
        assert_eq!(ctx.interpolator_channel_count(), 0);
        let out = ctx
            .shader(Stage::Vertex)
            .cached_variable("interp", "Output")
            .unwrap();
        assert_eq!(out.name, "i.Position");
    }
}
