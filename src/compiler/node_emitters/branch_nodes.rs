//! Emitters for control-flow constructs: Conditional, Switch, Iterate, Sum
//! and Discard.
//!
//! Every branch body is compiled into an isolated buffer with its own pin
//! scope, so statements emitted inside a branch land inside the generated
//! block and branch-local variables never leak into the enclosing text. The
//! construct's output variable is declared before the control statement; its
//! type is the widest type across all branches, which is only known after
//! every branch has been compiled.

use anyhow::{Context as _, Result, anyhow, bail};

use super::require_input;
use crate::compiler::context::Context;
use crate::compiler::shader::{Section, Variable, indent_block};
use crate::compiler::types::{Stage, ValueType, cast_expr, fmt_f32};
use crate::dsl::{Node, parse_i64, parse_str};

/// Comparison operator and its negation, from the node's Comparison mode.
fn comparison_ops(node: &Node) -> Result<(&'static str, &'static str)> {
    Ok(match parse_str(&node.params, "Comparison").unwrap_or("CoGreater") {
        "CoEqual" => ("==", "!="),
        "CoNotEqual" => ("!=", "=="),
        "CoGreater" => (">", "<="),
        "CoGreaterEqual" => (">=", "<"),
        "CoLess" => ("<", ">="),
        "CoLessEqual" => ("<=", ">"),
        other => bail!("{}: unknown comparison mode {other}", node.node_type),
    })
}

fn require_scalar(node: &Node, var: &Variable, pin: &str) -> Result<()> {
    if var.ty != ValueType::Scalar {
        bail!(
            "{}: {pin} comparison input must be scalar, got {}",
            node.node_type,
            var.ty.hlsl()
        );
    }
    Ok(())
}

pub(crate) fn emit_conditional(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let input = require_input(ctx, node, "Input", stage)?;
    let reference = require_input(ctx, node, "Reference", stage)?;
    require_scalar(node, &input, "Input")?;
    require_scalar(node, &reference, "Reference")?;
    let (op, _) = comparison_ops(node)?;
    ctx.allocate_boolean_register();

    let (true_text, true_var) =
        ctx.capture_branch(stage, |ctx| require_input(ctx, node, "CaseTrue", stage))?;
    let (false_text, false_var) =
        ctx.capture_branch(stage, |ctx| require_input(ctx, node, "CaseFalse", stage))?;

    let ty = ValueType::widest(true_var.ty, false_var.ty)
        .with_context(|| format!("{}: incompatible case types", node.node_type))?;
    let true_assign = cast_expr(&true_var.name, true_var.ty, ty)?;
    let false_assign = cast_expr(&false_var.name, false_var.ty, ty)?;

    let out = ctx.emit_output(node, "Output", ty, stage);
    let shader = ctx.shader_mut(stage);
    shader.stmt(format!("{} {};", ty.hlsl(), out.name));
    shader.stmt(format!("if ({} {op} {}) {{", input.name, reference.name));
    let body = shader.stream(Section::Body);
    body.push_str(&indent_block(&true_text));
    shader.stmt(format!("    {} = {true_assign};", out.name));
    shader.stmt("} else {");
    let body = shader.stream(Section::Body);
    body.push_str(&indent_block(&false_text));
    shader.stmt(format!("    {} = {false_assign};", out.name));
    shader.stmt("}");
    Ok(())
}

pub(crate) fn emit_switch(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let selector = require_input(ctx, node, "Input", stage)?;
    require_scalar(node, &selector, "Input")?;

    let labels: Vec<i64> = node
        .params
        .get("Cases")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_i64()).collect())
        .unwrap_or_default();
    if labels.is_empty() {
        bail!("{} missing Cases parameter", node.node_type);
    }

    let mut branches: Vec<(String, Variable)> = Vec::with_capacity(labels.len() + 1);
    for index in 0..labels.len() {
        let pin = format!("Case{index}");
        let captured =
            ctx.capture_branch(stage, |ctx| require_input(ctx, node, &pin, stage))?;
        branches.push(captured);
    }
    let default =
        ctx.capture_branch(stage, |ctx| require_input(ctx, node, "Default", stage))?;
    branches.push(default);

    let mut ty = branches[0].1.ty;
    for (_, var) in branches.iter().skip(1) {
        ty = ValueType::widest(ty, var.ty)
            .with_context(|| format!("{}: incompatible case types", node.node_type))?;
    }
    let assigns: Vec<String> = branches
        .iter()
        .map(|(_, var)| cast_expr(&var.name, var.ty, ty))
        .collect::<Result<_>>()?;

    let out = ctx.emit_output(node, "Output", ty, stage);
    let shader = ctx.shader_mut(stage);
    shader.stmt(format!("{} {};", ty.hlsl(), out.name));
    for (index, label) in labels.iter().enumerate() {
        let keyword = if index == 0 { "if" } else { "} else if" };
        shader.stmt(format!(
            "{keyword} ({} == {}) {{",
            selector.name,
            fmt_f32(*label as f32)
        ));
        let body = shader.stream(Section::Body);
        body.push_str(&indent_block(&branches[index].0));
        shader.stmt(format!("    {} = {};", out.name, assigns[index]));
    }
    shader.stmt("} else {");
    let body = shader.stream(Section::Body);
    body.push_str(&indent_block(&branches[labels.len()].0));
    shader.stmt(format!("    {} = {};", out.name, assigns[labels.len()]));
    shader.stmt("}");
    Ok(())
}

/// Iterate and Sum: a counted loop over a compile-time-constant range,
/// assigning (`=`) or accumulating (`+=`) the body result. The loop counter
/// is exposed to the body subtree through the Iteration output pin.
pub(crate) fn emit_counted_loop(
    ctx: &mut Context,
    node: &Node,
    stage: Stage,
    accumulate: bool,
) -> Result<()> {
    let start = parse_i64(&node.params, "Start").unwrap_or(0);
    let end = parse_i64(&node.params, "End")
        .ok_or_else(|| anyhow!("{} missing End parameter", node.node_type))?;

    let counter = ctx.shader_mut(stage).fresh_variable_name();
    let (body_text, body_var) = ctx.capture_branch(stage, |ctx| {
        // The counter binding lives in the branch scope; it is only
        // meaningful inside the loop body.
        ctx.shader_mut(stage).create_outer_variable(
            &node.id,
            "Iteration",
            format!("(float){counter}"),
            ValueType::Scalar,
        );
        require_input(ctx, node, "Input", stage)
    })?;

    let ty = body_var.ty;
    let zero = ty
        .zero_literal()
        .with_context(|| format!("{}: body must produce a scalar or vector", node.node_type))?;
    let assign_op = if accumulate { "+=" } else { "=" };

    let out = ctx.emit_output(node, "Output", ty, stage);
    let shader = ctx.shader_mut(stage);
    shader.stmt(format!("{} {} = {zero};", ty.hlsl(), out.name));
    shader.stmt(format!(
        "for (int {counter} = {start}; {counter} < {end}; ++{counter}) {{"
    ));
    let body = shader.stream(Section::Body);
    body.push_str(&indent_block(&body_text));
    shader.stmt(format!("    {} {assign_op} {};", out.name, body_var.name));
    shader.stmt("}");
    Ok(())
}

/// Discard is both a statement and a value-forwarding node: it emits a
/// `discard;` guarded by the negated comparison, then forwards its Pass
/// input as its own output.
pub(crate) fn emit_discard(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    if stage != Stage::Pixel {
        bail!(
            "{}: fragments can only be discarded in the pixel stage",
            node.node_type
        );
    }
    let input = require_input(ctx, node, "Input", stage)?;
    let reference = require_input(ctx, node, "Reference", stage)?;
    require_scalar(node, &input, "Input")?;
    require_scalar(node, &reference, "Reference")?;
    let (_, negated) = comparison_ops(node)?;
    ctx.allocate_boolean_register();

    ctx.shader_mut(stage).stmt(format!(
        "if ({} {negated} {}) discard;",
        input.name, reference.name
    ));

    let pass = require_input(ctx, node, "Pass", stage)?;
    ctx.shader_mut(stage)
        .create_outer_variable(&node.id, "Output", pass.name, pass.ty);
    Ok(())
}
