//! Node emitters, one module per node family.
//!
//! Each emitter is a function `(ctx, node, stage) -> Result<()>` whose side
//! effect is appended code plus cached output variables on the node's output
//! pins. Emitters consume inputs through [`require_input`] and never read
//! the graph directly.

pub mod branch_nodes;
pub mod constant_nodes;
pub mod input_nodes;
pub mod interpolator;
pub mod math_nodes;
pub mod output_nodes;
pub mod texture_nodes;
pub mod vector_nodes;

use anyhow::{Result, anyhow};

use crate::compiler::context::Context;
use crate::compiler::shader::Variable;
use crate::compiler::types::{Stage, ValueType};
use crate::dsl::Node;

/// Resolve a mandatory input pin, failing with the node kind and pin name
/// when unconnected.
pub(crate) fn require_input(
    ctx: &mut Context,
    node: &Node,
    pin: &str,
    stage: Stage,
) -> Result<Variable> {
    ctx.emit_input(node, pin, stage)?
        .ok_or_else(|| anyhow!("{} missing input {pin}", node.node_type))
}

/// Declare `<ty> <name> = <expr>;` in the stage body and cache it on the
/// node's output pin.
pub(crate) fn declare_output(
    ctx: &mut Context,
    node: &Node,
    pin: &str,
    ty: ValueType,
    expr: &str,
    stage: Stage,
) -> Variable {
    let out = ctx.emit_output(node, pin, ty, stage);
    ctx.shader_mut(stage)
        .stmt(format!("{} {} = {expr};", ty.hlsl(), out.name));
    out
}
