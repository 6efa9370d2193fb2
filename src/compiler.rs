//! The graph-to-source compiler.
//!
//! `compile` drives the two top-level emissions: the pixel-output subtree
//! first (recursively entering the vertex stage whenever a dependency must
//! originate there), then the vertex-output subtree. Each node kind has one
//! emitter; dispatch is an exhaustive match over the closed [`NodeKind`]
//! sum type, so a kind without an emitter cannot exist past parsing.

pub mod context;
pub mod node_emitters;
pub mod program;
pub mod render_state;
pub mod shader;
pub mod types;

use anyhow::{Result, anyhow, bail};

use crate::dsl::{Node, ShaderGraph};
use context::Context;
use node_emitters::{
    branch_nodes, constant_nodes, input_nodes, interpolator, math_nodes, output_nodes,
    texture_nodes, vector_nodes,
};
use node_emitters::math_nodes::{BinaryOp, TernaryOp, UnaryOp};
use types::Stage;

pub use program::{CompiledProgram, SamplerBinding, UniformBinding};
pub use render_state::RenderState;
pub use types::ValueType;

/// Every compilable node kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    Power,
    Dot,
    Cross,
    MultiplyAdd,
    Lerp,
    SmoothStep,
    Clamp,
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
    // Constants
    Scalar,
    Vector2,
    Vector3,
    Vector4,
    Color,
    // Constructive
    MixIn,
    MatrixIn,
    Transform,
    // Stage inputs and parameters
    VertexInput,
    ScreenPosition,
    Uniform,
    IndexedUniform,
    // Texturing
    Texture,
    Sampler,
    // Stage crossing
    Interpolator,
    // Control flow
    Conditional,
    Switch,
    Iterate,
    Sum,
    Discard,
    // Terminals
    VertexOutput,
    PixelOutput,
}

impl NodeKind {
    pub fn parse(s: &str) -> Option<NodeKind> {
        Some(match s {
            "Add" => NodeKind::Add,
            "Subtract" => NodeKind::Subtract,
            "Multiply" => NodeKind::Multiply,
            "Divide" => NodeKind::Divide,
            "Min" => NodeKind::Min,
            "Max" => NodeKind::Max,
            "Power" => NodeKind::Power,
            "Dot" => NodeKind::Dot,
            "Cross" => NodeKind::Cross,
            "MultiplyAdd" => NodeKind::MultiplyAdd,
            "Lerp" => NodeKind::Lerp,
            "SmoothStep" => NodeKind::SmoothStep,
            "Clamp" => NodeKind::Clamp,
            "Abs" => NodeKind::Abs,
            "Negate" => NodeKind::Negate,
            "Sign" => NodeKind::Sign,
            "Exponential" => NodeKind::Exponential,
            "Logarithm" => NodeKind::Logarithm,
            "SquareRoot" => NodeKind::SquareRoot,
            "Fraction" => NodeKind::Fraction,
            "Floor" => NodeKind::Floor,
            "Sine" => NodeKind::Sine,
            "Cosine" => NodeKind::Cosine,
            "Tangent" => NodeKind::Tangent,
            "ArcSine" => NodeKind::ArcSine,
            "ArcCosine" => NodeKind::ArcCosine,
            "ArcTangent" => NodeKind::ArcTangent,
            "Normalize" => NodeKind::Normalize,
            "Length" => NodeKind::Length,
            "Scalar" => NodeKind::Scalar,
            "Vector2" => NodeKind::Vector2,
            "Vector3" => NodeKind::Vector3,
            "Vector4" => NodeKind::Vector4,
            "Color" => NodeKind::Color,
            "MixIn" => NodeKind::MixIn,
            "MatrixIn" => NodeKind::MatrixIn,
            "Transform" => NodeKind::Transform,
            "VertexInput" => NodeKind::VertexInput,
            "ScreenPosition" => NodeKind::ScreenPosition,
            "Uniform" => NodeKind::Uniform,
            "IndexedUniform" => NodeKind::IndexedUniform,
            "Texture" => NodeKind::Texture,
            "Sampler" => NodeKind::Sampler,
            "Interpolator" => NodeKind::Interpolator,
            "Conditional" => NodeKind::Conditional,
            "Switch" => NodeKind::Switch,
            "Iterate" => NodeKind::Iterate,
            "Sum" => NodeKind::Sum,
            "Discard" => NodeKind::Discard,
            "VertexOutput" => NodeKind::VertexOutput,
            "PixelOutput" => NodeKind::PixelOutput,
            _ => return None,
        })
    }
}

/// Compile a validated graph into the two stage programs plus metadata.
///
/// Pure function of the graph: no shared state survives between compiles,
/// and two compiles of the same graph produce byte-identical output.
pub fn compile(graph: &ShaderGraph) -> Result<CompiledProgram> {
    // Terminal-node counts are checked before any text is emitted.
    let pixel_output = single_terminal(graph, "PixelOutput")?;
    let vertex_output = single_terminal(graph, "VertexOutput")?;

    let mut ctx = Context::new(graph);
    emit_node(&mut ctx, &pixel_output, Stage::Pixel)?;
    emit_node(&mut ctx, &vertex_output, Stage::Vertex)?;
    Ok(program::assemble(ctx))
}

fn single_terminal(graph: &ShaderGraph, kind: &str) -> Result<Node> {
    let found = graph.find_nodes_of(kind);
    if found.len() != 1 {
        bail!("expected exactly 1 {kind} node, got {}", found.len());
    }
    Ok(found[0].clone())
}

/// Emit one node into `stage`. The side effect is appended code plus cached
/// output variables; consumers retrieve them through the pin cache.
pub(crate) fn emit_node(ctx: &mut Context, node: &Node, stage: Stage) -> Result<()> {
    let kind = NodeKind::parse(&node.node_type)
        .ok_or_else(|| anyhow!("no emitter for node kind: {}", node.node_type))?;
    match kind {
        NodeKind::Add => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Add),
        NodeKind::Subtract => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Subtract),
        NodeKind::Multiply => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Multiply),
        NodeKind::Divide => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Divide),
        NodeKind::Min => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Min),
        NodeKind::Max => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Max),
        NodeKind::Power => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Power),
        NodeKind::Dot => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Dot),
        NodeKind::Cross => math_nodes::emit_binary(ctx, node, stage, BinaryOp::Cross),
        NodeKind::MultiplyAdd => {
            math_nodes::emit_ternary(ctx, node, stage, TernaryOp::MultiplyAdd)
        }
        NodeKind::Lerp => math_nodes::emit_ternary(ctx, node, stage, TernaryOp::Lerp),
        NodeKind::SmoothStep => math_nodes::emit_ternary(ctx, node, stage, TernaryOp::SmoothStep),
        NodeKind::Clamp => math_nodes::emit_clamp(ctx, node, stage),
        NodeKind::Abs => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Abs),
        NodeKind::Negate => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Negate),
        NodeKind::Sign => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Sign),
        NodeKind::Exponential => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Exponential),
        NodeKind::Logarithm => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Logarithm),
        NodeKind::SquareRoot => math_nodes::emit_unary(ctx, node, stage, UnaryOp::SquareRoot),
        NodeKind::Fraction => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Fraction),
        NodeKind::Floor => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Floor),
        NodeKind::Sine => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Sine),
        NodeKind::Cosine => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Cosine),
        NodeKind::Tangent => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Tangent),
        NodeKind::ArcSine => math_nodes::emit_unary(ctx, node, stage, UnaryOp::ArcSine),
        NodeKind::ArcCosine => math_nodes::emit_unary(ctx, node, stage, UnaryOp::ArcCosine),
        NodeKind::ArcTangent => math_nodes::emit_unary(ctx, node, stage, UnaryOp::ArcTangent),
        NodeKind::Normalize => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Normalize),
        NodeKind::Length => math_nodes::emit_unary(ctx, node, stage, UnaryOp::Length),
        NodeKind::Scalar => constant_nodes::emit_scalar(ctx, node, stage),
        NodeKind::Vector2 => constant_nodes::emit_vector(ctx, node, stage, 2),
        NodeKind::Vector3 => constant_nodes::emit_vector(ctx, node, stage, 3),
        NodeKind::Vector4 => constant_nodes::emit_vector(ctx, node, stage, 4),
        NodeKind::Color => constant_nodes::emit_color(ctx, node, stage),
        NodeKind::MixIn => vector_nodes::emit_mix_in(ctx, node, stage),
        NodeKind::MatrixIn => vector_nodes::emit_matrix_in(ctx, node, stage),
        NodeKind::Transform => vector_nodes::emit_transform(ctx, node, stage),
        NodeKind::VertexInput => input_nodes::emit_vertex_input(ctx, node, stage),
        NodeKind::ScreenPosition => input_nodes::emit_screen_position(ctx, node, stage),
        NodeKind::Uniform => input_nodes::emit_uniform(ctx, node, stage),
        NodeKind::IndexedUniform => input_nodes::emit_indexed_uniform(ctx, node, stage),
        NodeKind::Texture => texture_nodes::emit_texture(ctx, node, stage),
        NodeKind::Sampler => texture_nodes::emit_sampler(ctx, node, stage),
        NodeKind::Interpolator => interpolator::emit_interpolator(ctx, node, stage),
        NodeKind::Conditional => branch_nodes::emit_conditional(ctx, node, stage),
        NodeKind::Switch => branch_nodes::emit_switch(ctx, node, stage),
        NodeKind::Iterate => branch_nodes::emit_counted_loop(ctx, node, stage, false),
        NodeKind::Sum => branch_nodes::emit_counted_loop(ctx, node, stage, true),
        NodeKind::Discard => branch_nodes::emit_discard(ctx, node, stage),
        NodeKind::VertexOutput => output_nodes::emit_vertex_output(ctx, node),
        NodeKind::PixelOutput => output_nodes::emit_pixel_output(ctx, node),
    }
}
