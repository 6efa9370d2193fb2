//! Emitters for literal constant nodes. These never read an input pin.

use anyhow::Result;

use crate::compiler::context::Context;
use crate::compiler::types::{Stage, ValueType, fmt_f32};
use crate::dsl::{Node, parse_f32};

pub(crate) fn emit_scalar(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let value = parse_f32(&node.params, "Value").unwrap_or(0.0);
    let out = ctx.emit_output(node, "Output", ValueType::Scalar, stage);
    ctx.shader_mut(stage)
        .stmt(format!("const float {} = {};", out.name, fmt_f32(value)));
    Ok(())
}

pub(crate) fn emit_vector(ctx: &mut Context, node: &Node, stage: Stage, width: u32) -> Result<()> {
    let ty = ValueType::with_width(width)?;
    let components: Vec<String> = ["X", "Y", "Z", "W"]
        .iter()
        .take(width as usize)
        .map(|key| fmt_f32(parse_f32(&node.params, key).unwrap_or(0.0)))
        .collect();
    let out = ctx.emit_output(node, "Output", ty, stage);
    ctx.shader_mut(stage).stmt(format!(
        "const {} {} = {}({});",
        ty.hlsl(),
        out.name,
        ty.hlsl(),
        components.join(", ")
    ));
    Ok(())
}

pub(crate) fn emit_color(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let r = parse_f32(&node.params, "R").unwrap_or(0.0);
    let g = parse_f32(&node.params, "G").unwrap_or(0.0);
    let b = parse_f32(&node.params, "B").unwrap_or(0.0);
    let a = parse_f32(&node.params, "A").unwrap_or(1.0);
    let out = ctx.emit_output(node, "Output", ValueType::Vec4, stage);
    ctx.shader_mut(stage).stmt(format!(
        "const float4 {} = float4({}, {}, {}, {});",
        out.name,
        fmt_f32(r),
        fmt_f32(g),
        fmt_f32(b),
        fmt_f32(a)
    ));
    Ok(())
}
