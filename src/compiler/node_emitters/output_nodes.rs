//! Emitters for the two terminal nodes.
//!
//! VertexOutput writes the homogeneous position; PixelOutput writes the
//! color output and is the single producer of render state.

use anyhow::Result;

use super::require_input;
use crate::compiler::context::Context;
use crate::compiler::render_state::{
    parse_blend_factor, parse_blend_operation, parse_compare_function, parse_cull_mode,
};
use crate::compiler::types::{Stage, ValueType, cast_to_color, cast_to_position};
use crate::dsl::{Node, parse_bool, parse_str, parse_u32};

pub(crate) fn emit_vertex_output(ctx: &mut Context, node: &Node) -> Result<()> {
    let input = require_input(ctx, node, "Input", Stage::Vertex)?;
    let expr = cast_to_position(&input.name, input.ty)?;
    ctx.shader_mut(Stage::Vertex)
        .stmt(format!("o.Position = {expr};"));
    Ok(())
}

pub(crate) fn emit_pixel_output(ctx: &mut Context, node: &Node) -> Result<()> {
    let input = require_input(ctx, node, "Input", Stage::Pixel)?;
    let expr = cast_to_color(&input.name, input.ty)?;

    let color = ctx
        .shader_mut(Stage::Pixel)
        .create_temporary_variable(ValueType::Vec4);
    let shader = ctx.shader_mut(Stage::Pixel);
    shader.stmt(format!("float4 {} = {expr};", color.name));
    shader.stmt(format!("return {};", color.name));

    apply_render_state(ctx, node)
}

fn apply_render_state(ctx: &mut Context, node: &Node) -> Result<()> {
    let params = &node.params;

    // Parse everything up front so a bad parameter fails the compile before
    // any state is half-applied.
    let source_blend = parse_str(params, "SourceBlend")
        .map(parse_blend_factor)
        .transpose()?;
    let dest_blend = parse_str(params, "DestBlend")
        .map(parse_blend_factor)
        .transpose()?;
    let blend_operation = parse_str(params, "BlendOperation")
        .map(parse_blend_operation)
        .transpose()?;
    let depth_function = parse_str(params, "DepthFunction")
        .map(parse_compare_function)
        .transpose()?;
    let cull_mode = parse_str(params, "CullMode")
        .map(parse_cull_mode)
        .transpose()?;

    let state = ctx.render_state_mut();
    if let Some(enable) = parse_bool(params, "BlendEnable") {
        state.blend_enable = enable;
    }
    if let Some(factor) = source_blend {
        state.source_blend = factor;
    }
    if let Some(factor) = dest_blend {
        state.dest_blend = factor;
    }
    if let Some(op) = blend_operation {
        state.blend_operation = op;
    }
    if let Some(enable) = parse_bool(params, "DepthTestEnable") {
        state.depth_test_enable = enable;
    }
    if let Some(enable) = parse_bool(params, "DepthWriteEnable") {
        state.depth_write_enable = enable;
    }
    if let Some(func) = depth_function {
        state.depth_function = func;
    }
    if let Some(enable) = parse_bool(params, "StencilEnable") {
        state.stencil_enable = enable;
    }
    if let Some(reference) = parse_u32(params, "StencilReference") {
        state.stencil_reference = reference;
    }
    if let Some(mode) = cull_mode {
        state.cull_mode = mode;
    }
    if let Some(mask) = parse_u32(params, "ColorWriteMask") {
        state.color_write_mask = (mask & 0xf) as u8;
    }
    if let Some(registers) = parse_u32(params, "Registers") {
        ctx.set_register_count(registers);
    }
    Ok(())
}
