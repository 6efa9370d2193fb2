//! Emitters for stage inputs and shader parameters: vertex attributes,
//! screen position, and the uniform register file.

use anyhow::{Result, anyhow, bail};

use super::{declare_output, require_input};
use crate::compiler::context::Context;
use crate::compiler::shader::Section;
use crate::compiler::types::{Stage, ValueType};
use crate::dsl::{Node, parse_str, parse_u32};

fn vertex_semantic(name: &str) -> Option<(&'static str, &'static str, ValueType)> {
    Some(match name {
        "Position" => ("Position", "POSITION", ValueType::Vec3),
        "Normal" => ("Normal", "NORMAL", ValueType::Vec3),
        "Tangent" => ("Tangent", "TANGENT", ValueType::Vec3),
        "Color" => ("Color", "COLOR0", ValueType::Vec4),
        "TexCoord0" => ("TexCoord0", "TEXCOORD0", ValueType::Vec2),
        "TexCoord1" => ("TexCoord1", "TEXCOORD1", ValueType::Vec2),
        "TexCoord2" => ("TexCoord2", "TEXCOORD2", ValueType::Vec2),
        "TexCoord3" => ("TexCoord3", "TEXCOORD3", ValueType::Vec2),
        "TexCoord4" => ("TexCoord4", "TEXCOORD4", ValueType::Vec2),
        "TexCoord5" => ("TexCoord5", "TEXCOORD5", ValueType::Vec2),
        "TexCoord6" => ("TexCoord6", "TEXCOORD6", ValueType::Vec2),
        "TexCoord7" => ("TexCoord7", "TEXCOORD7", ValueType::Vec2),
        _ => return None,
    })
}

pub(crate) fn emit_vertex_input(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    if stage != Stage::Vertex {
        bail!(
            "{}: vertex attributes are only available in the vertex stage; \
             route the value through an Interpolator",
            node.node_type
        );
    }
    let semantic = parse_str(&node.params, "Semantic")
        .ok_or_else(|| anyhow!("{} missing Semantic parameter", node.node_type))?;
    let (field, decl_semantic, ty) = vertex_semantic(semantic)
        .ok_or_else(|| anyhow!("{}: unknown semantic {semantic}", node.node_type))?;

    let shader = ctx.shader_mut(stage);
    if !shader.have_input(field) {
        shader.add_input(field, &format!("    {} {field} : {decl_semantic};", ty.hlsl()));
    }
    shader.create_outer_variable(&node.id, "Output", format!("i.{field}"), ty);
    Ok(())
}

pub(crate) fn emit_screen_position(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    if stage != Stage::Pixel {
        bail!(
            "{}: the screen position register exists only in the pixel stage",
            node.node_type
        );
    }
    ctx.mark_screen_position_used();
    let shader = ctx.shader_mut(stage);
    if !shader.have_input("VPos") {
        shader.add_input("VPos", "    float2 VPos : VPOS;");
    }
    shader.create_outer_variable(&node.id, "Output", "i.VPos", ValueType::Vec2);
    Ok(())
}

fn parse_uniform_type(node: &Node) -> Result<ValueType> {
    Ok(match parse_str(&node.params, "Type") {
        None | Some("Vec4") => ValueType::Vec4,
        Some("Scalar") => ValueType::Scalar,
        Some("Vec2") => ValueType::Vec2,
        Some("Vec3") => ValueType::Vec3,
        Some("Matrix4x4") => ValueType::Matrix4x4,
        Some(other) => bail!("{}: unsupported uniform type {other}", node.node_type),
    })
}

/// Uniform binds its output pin straight to the uniform's name; the
/// declaration and register are allocated once per distinct name no matter
/// how many graph nodes reference it.
pub(crate) fn emit_uniform(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let name = parse_str(&node.params, "Name")
        .ok_or_else(|| anyhow!("{} missing Name parameter", node.node_type))?
        .to_string();
    let ty = parse_uniform_type(node)?;

    let shader = ctx.shader_mut(stage);
    if !shader.has_uniform(&name) {
        let register = shader.add_uniform(&name, ty, 0);
        shader.line(
            Section::Uniform,
            format!("{} {name} : register(c{register});", ty.hlsl()),
        );
    }
    shader.create_outer_variable(&node.id, "Output", name, ty);
    Ok(())
}

/// IndexedUniform declares an array uniform and a temporary holding the
/// element at the Index input.
pub(crate) fn emit_indexed_uniform(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let name = parse_str(&node.params, "Name")
        .ok_or_else(|| anyhow!("{} missing Name parameter", node.node_type))?
        .to_string();
    let ty = parse_uniform_type(node)?;
    let length = parse_u32(&node.params, "Length")
        .filter(|len| *len > 0)
        .ok_or_else(|| anyhow!("{} missing array Length parameter", node.node_type))?;

    let index = require_input(ctx, node, "Index", stage)?;
    if index.ty != ValueType::Scalar {
        bail!(
            "{}: Index input must be scalar, got {}",
            node.node_type,
            index.ty.hlsl()
        );
    }

    let shader = ctx.shader_mut(stage);
    if !shader.has_uniform(&name) {
        let register = shader.add_uniform(&name, ty, length);
        shader.line(
            Section::Uniform,
            format!("{} {name}[{length}] : register(c{register});", ty.hlsl()),
        );
    }
    let expr = format!("{name}[(int){}]", index.name);
    declare_output(ctx, node, "Output", ty, &expr, stage);
    Ok(())
}
