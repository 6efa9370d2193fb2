//! Emitters for Texture and Sampler nodes.

use anyhow::{Result, anyhow, bail};

use super::{declare_output, require_input};
use crate::compiler::context::Context;
use crate::compiler::render_state::{SamplerLookup, sampler_state_from_params};
use crate::compiler::shader::Section;
use crate::compiler::types::{Stage, ValueType, cast_expr};
use crate::dsl::{Node, parse_str};

/// Texture binds its output pin to the texture parameter name. The actual
/// declaration happens when a Sampler first claims a slot for it.
pub(crate) fn emit_texture(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let name = parse_str(&node.params, "Name")
        .ok_or_else(|| anyhow!("{} missing Name parameter", node.node_type))?
        .to_string();
    ctx.shader_mut(stage)
        .create_outer_variable(&node.id, "Output", name, ValueType::Texture);
    Ok(())
}

/// Sampler resolves a texture and a coordinate, allocates (or reuses) the
/// stage sampler slot, and emits the stage-appropriate sample instruction.
/// Outside the pixel stage implicit LOD derivatives do not exist, so the
/// vertex variant samples with an explicit LOD of zero.
pub(crate) fn emit_sampler(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let texture = require_input(ctx, node, "Texture", stage)?;
    if texture.ty != ValueType::Texture {
        bail!(
            "{}: Texture input must be a texture, got {}",
            node.node_type,
            texture.ty.hlsl()
        );
    }

    let state = sampler_state_from_params(&node.params)?;
    let coord_ty = ValueType::with_width(state.lookup.coord_width())?;

    let coord = require_input(ctx, node, "TexCoord", stage)?;
    let coord_expr = cast_expr(&coord.name, coord.ty, coord_ty)
        .map_err(|_| {
            anyhow!(
                "{}: TexCoord input must fit {}, got {}",
                node.node_type,
                coord_ty.hlsl(),
                coord.ty.hlsl()
            )
        })?;

    let (is_new, slot) = ctx
        .shader_mut(stage)
        .define_sampler_texture(&texture.name, state);
    if is_new {
        let decl = format!(
            "{} {} : register(s{slot});",
            state.lookup.sampler_type(),
            texture.name
        );
        ctx.shader_mut(stage).line(Section::Uniform, decl);
    }

    let instruction = match state.lookup {
        SamplerLookup::Tex2D => "tex2D",
        SamplerLookup::Tex3D => "tex3D",
        SamplerLookup::Cube => "texCUBE",
    };
    let expr = match stage {
        Stage::Pixel => format!("{instruction}({}, {coord_expr})", texture.name),
        Stage::Vertex => {
            let lod_coord = cast_expr(&coord_expr, coord_ty, ValueType::Vec4)?;
            format!("{instruction}lod({}, {lod_coord})", texture.name)
        }
    };

    declare_output(ctx, node, "Output", ValueType::Vec4, &expr, stage);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::{test_connection, test_graph, test_node};
    use crate::compiler::context::Context;
    use crate::compiler::emit_node;
    use crate::compiler::render_state::SamplerFilter;
    use crate::compiler::types::Stage;

    fn sampler_graph() -> crate::dsl::ShaderGraph {
        test_graph(
            vec![
                test_node("tex", "Texture", serde_json::json!({"Name": "Diffuse"})),
                test_node("uv", "Vector2", serde_json::json!({"X": 0.5, "Y": 0.5})),
                test_node("samp", "Sampler", serde_json::json!({"Lookup": "2D"})),
            ],
            vec![
                test_connection("tex", "Output", "samp", "Texture"),
                test_connection("uv", "Output", "samp", "TexCoord"),
            ],
        )
    }

    #[test]
    fn pixel_stage_samples_directly() {
        let graph = sampler_graph();
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["samp"], Stage::Pixel).unwrap();
        let src = ctx.shader(Stage::Pixel).generated_source();
        assert!(src.contains("sampler2D Diffuse : register(s0);"));
        assert!(src.contains("tex2D(Diffuse, p0)"));
    }

    #[test]
    fn vertex_stage_samples_with_explicit_lod() {
        let graph = sampler_graph();
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["samp"], Stage::Vertex).unwrap();
        let src = ctx.shader(Stage::Vertex).generated_source();
        assert!(src.contains("tex2Dlod(Diffuse, float4(v0, 0.0, 0.0))"));
    }

    #[test]
    fn two_samplers_share_one_slot_and_identifier() {
        let graph = test_graph(
            vec![
                test_node("tex", "Texture", serde_json::json!({"Name": "Diffuse"})),
                test_node("uv", "Vector2", serde_json::json!({"X": 0.5, "Y": 0.5})),
                test_node("s1", "Sampler", serde_json::json!({})),
                test_node("s2", "Sampler", serde_json::json!({})),
            ],
            vec![
                test_connection("tex", "Output", "s1", "Texture"),
                test_connection("uv", "Output", "s1", "TexCoord"),
                test_connection("tex", "Output", "s2", "Texture"),
                test_connection("uv", "Output", "s2", "TexCoord"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["s1"], Stage::Pixel).unwrap();
        emit_node(&mut ctx, &nodes["s2"], Stage::Pixel).unwrap();
        let src = ctx.shader(Stage::Pixel).generated_source();
        assert_eq!(src.matches("register(s0)").count(), 1);
        assert_eq!(src.matches("tex2D(Diffuse, p0)").count(), 2);
        assert_eq!(ctx.shader(Stage::Pixel).sampler_table().len(), 1);
    }

    #[test]
    fn sampler_state_snapshots_on_first_declaration_only() {
        let graph = test_graph(
            vec![
                test_node("tex", "Texture", serde_json::json!({"Name": "Diffuse"})),
                test_node("uv", "Vector2", serde_json::json!({"X": 0.5, "Y": 0.5})),
                test_node("s1", "Sampler", serde_json::json!({"Filter": "point"})),
                test_node("s2", "Sampler", serde_json::json!({"Filter": "anisotropic"})),
            ],
            vec![
                test_connection("tex", "Output", "s1", "Texture"),
                test_connection("uv", "Output", "s1", "TexCoord"),
                test_connection("tex", "Output", "s2", "Texture"),
                test_connection("uv", "Output", "s2", "TexCoord"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        emit_node(&mut ctx, &nodes["s1"], Stage::Pixel).unwrap();
        emit_node(&mut ctx, &nodes["s2"], Stage::Pixel).unwrap();
        let table = ctx.shader(Stage::Pixel).sampler_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].state.filter, SamplerFilter::Point);
    }

    #[test]
    fn non_texture_input_is_rejected() {
        let graph = test_graph(
            vec![
                test_node("s", "Scalar", serde_json::json!({"Value": 1.0})),
                test_node("uv", "Vector2", serde_json::json!({"X": 0.5, "Y": 0.5})),
                test_node("samp", "Sampler", serde_json::json!({})),
            ],
            vec![
                test_connection("s", "Output", "samp", "Texture"),
                test_connection("uv", "Output", "samp", "TexCoord"),
            ],
        );
        let nodes = graph.nodes_by_id();
        let mut ctx = Context::new(&graph);
        let err = emit_node(&mut ctx, &nodes["samp"], Stage::Pixel).unwrap_err();
        assert!(err.to_string().contains("Texture input must be a texture"));
    }
}
