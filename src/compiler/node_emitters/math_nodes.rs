//! Emitters for the pure arithmetic node family.
//!
//! All of these execute in whatever stage their consumer is being emitted
//! in, follow the widening rules of the type system, and produce exactly one
//! `<type> <name> = <expr>;` statement at the current scope.

use anyhow::{Context as _, Result, bail};

use super::{declare_output, require_input};
use crate::compiler::context::Context;
use crate::compiler::shader::Variable;
use crate::compiler::types::{Stage, ValueType, cast_expr, fmt_f32};
use crate::dsl::{Node, parse_f32};

#[derive(Clone, Copy, Debug)]
pub(crate) enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Power,
    Dot,
    Cross,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum TernaryOp {
    MultiplyAdd,
    Lerp,
    SmoothStep,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum UnaryOp {
    Abs,
    Negate,
    Sign,
    Exponential,
    Logarithm,
    SquareRoot,
    Fraction,
    Floor,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    Normalize,
    Length,
}

fn widen_pair(node: &Node, a: &Variable, b: &Variable) -> Result<(String, String, ValueType)> {
    let ty = ValueType::widest(a.ty, b.ty)
        .with_context(|| format!("{}: incompatible input types", node.node_type))?;
    Ok((
        cast_expr(&a.name, a.ty, ty)?,
        cast_expr(&b.name, b.ty, ty)?,
        ty,
    ))
}

pub(crate) fn emit_binary(
    ctx: &mut Context,
    node: &Node,
    stage: Stage,
    op: BinaryOp,
) -> Result<()> {
    let a = require_input(ctx, node, "Input1", stage)?;
    let b = require_input(ctx, node, "Input2", stage)?;

    let (expr, ty) = match op {
        BinaryOp::Add => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("{ae} + {be}"), ty)
        }
        BinaryOp::Subtract => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("{ae} - {be}"), ty)
        }
        BinaryOp::Multiply => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("{ae} * {be}"), ty)
        }
        BinaryOp::Divide => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("{ae} / {be}"), ty)
        }
        BinaryOp::Min => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("min({ae}, {be})"), ty)
        }
        BinaryOp::Max => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("max({ae}, {be})"), ty)
        }
        BinaryOp::Power => {
            let (ae, be, ty) = widen_pair(node, &a, &b)?;
            (format!("pow({ae}, {be})"), ty)
        }
        BinaryOp::Dot => {
            let (ae, be, _ty) = widen_pair(node, &a, &b)?;
            (format!("dot({ae}, {be})"), ValueType::Scalar)
        }
        BinaryOp::Cross => {
            for v in [&a, &b] {
                if !matches!(v.ty.width(), Some(1..=3)) {
                    bail!("{}: cross inputs must be at most 3-wide", node.node_type);
                }
            }
            let ae = cast_expr(&a.name, a.ty, ValueType::Vec3)?;
            let be = cast_expr(&b.name, b.ty, ValueType::Vec3)?;
            (format!("cross({ae}, {be})"), ValueType::Vec3)
        }
    };

    declare_output(ctx, node, "Output", ty, &expr, stage);
    Ok(())
}

pub(crate) fn emit_ternary(
    ctx: &mut Context,
    node: &Node,
    stage: Stage,
    op: TernaryOp,
) -> Result<()> {
    let (pin_a, pin_b, pin_c) = match op {
        TernaryOp::MultiplyAdd => ("Input1", "Input2", "Input3"),
        TernaryOp::Lerp => ("Input1", "Input2", "Alpha"),
        TernaryOp::SmoothStep => ("Min", "Max", "Input"),
    };
    let a = require_input(ctx, node, pin_a, stage)?;
    let b = require_input(ctx, node, pin_b, stage)?;
    let c = require_input(ctx, node, pin_c, stage)?;

    let ty = ValueType::widest(ValueType::widest(a.ty, b.ty)?, c.ty)
        .with_context(|| format!("{}: incompatible input types", node.node_type))?;
    let ae = cast_expr(&a.name, a.ty, ty)?;
    let be = cast_expr(&b.name, b.ty, ty)?;
    let ce = cast_expr(&c.name, c.ty, ty)?;

    let expr = match op {
        TernaryOp::MultiplyAdd => format!("{ae} * {be} + {ce}"),
        TernaryOp::Lerp => format!("lerp({ae}, {be}, {ce})"),
        TernaryOp::SmoothStep => format!("smoothstep({ae}, {be}, {ce})"),
    };

    declare_output(ctx, node, "Output", ty, &expr, stage);
    Ok(())
}

pub(crate) fn emit_unary(ctx: &mut Context, node: &Node, stage: Stage, op: UnaryOp) -> Result<()> {
    let a = require_input(ctx, node, "Input", stage)?;
    if !matches!(a.ty.width(), Some(1..=4)) {
        bail!(
            "{}: input must be scalar or vector, got {}",
            node.node_type,
            a.ty.hlsl()
        );
    }

    let (expr, ty) = match op {
        UnaryOp::Abs => (format!("abs({})", a.name), a.ty),
        UnaryOp::Negate => (format!("-({})", a.name), a.ty),
        UnaryOp::Sign => (format!("sign({})", a.name), a.ty),
        UnaryOp::Exponential => (format!("exp({})", a.name), a.ty),
        UnaryOp::Logarithm => (format!("log({})", a.name), a.ty),
        UnaryOp::SquareRoot => (format!("sqrt({})", a.name), a.ty),
        UnaryOp::Fraction => (format!("frac({})", a.name), a.ty),
        UnaryOp::Floor => (format!("floor({})", a.name), a.ty),
        UnaryOp::Sine => (format!("sin({})", a.name), a.ty),
        UnaryOp::Cosine => (format!("cos({})", a.name), a.ty),
        UnaryOp::Tangent => (format!("tan({})", a.name), a.ty),
        UnaryOp::ArcSine => (format!("asin({})", a.name), a.ty),
        UnaryOp::ArcCosine => (format!("acos({})", a.name), a.ty),
        UnaryOp::ArcTangent => (format!("atan({})", a.name), a.ty),
        UnaryOp::Normalize => (format!("normalize({})", a.name), a.ty),
        UnaryOp::Length => (format!("length({})", a.name), ValueType::Scalar),
    };

    declare_output(ctx, node, "Output", ty, &expr, stage);
    Ok(())
}

/// Clamp carries its bounds as literal parameters, not input pins.
pub(crate) fn emit_clamp(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let a = require_input(ctx, node, "Input", stage)?;
    if !matches!(a.ty.width(), Some(1..=4)) {
        bail!(
            "{}: input must be scalar or vector, got {}",
            node.node_type,
            a.ty.hlsl()
        );
    }
    let lo = parse_f32(&node.params, "Min").unwrap_or(0.0);
    let hi = parse_f32(&node.params, "Max").unwrap_or(1.0);
    let expr = format!("clamp({}, {}, {})", a.name, fmt_f32(lo), fmt_f32(hi));
    declare_output(ctx, node, "Output", a.ty, &expr, stage);
    Ok(())
}
