//! Final compile artifact: the two stage sources plus the binding metadata
//! the runtime needs to execute them.

use crate::compiler::context::Context;
use crate::compiler::render_state::{RenderState, SamplerStateDesc};
use crate::compiler::types::{Stage, ValueType};

/// One named uniform in a stage's register file.
#[derive(Clone, Debug, PartialEq)]
pub struct UniformBinding {
    pub name: String,
    pub ty: ValueType,
    pub register: u32,
    /// 0 for non-array uniforms.
    pub array_length: u32,
}

/// One sampler slot in a stage, with the filter/address state snapshotted at
/// first declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplerBinding {
    /// Texture parameter name; doubles as the declared sampler identifier.
    pub texture: String,
    pub slot: u32,
    pub state: SamplerStateDesc,
}

/// Output of a successful compile.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledProgram {
    pub vertex_source: String,
    pub pixel_source: String,
    pub render_state: RenderState,
    pub vertex_uniforms: Vec<UniformBinding>,
    pub pixel_uniforms: Vec<UniformBinding>,
    pub vertex_samplers: Vec<SamplerBinding>,
    pub pixel_samplers: Vec<SamplerBinding>,
    pub interpolator_channels: u32,
    pub needs_screen_position: bool,
    pub register_count: u32,
}

pub(crate) fn assemble(ctx: Context) -> CompiledProgram {
    CompiledProgram {
        vertex_source: ctx.shader(Stage::Vertex).generated_source(),
        pixel_source: ctx.shader(Stage::Pixel).generated_source(),
        render_state: ctx.render_state().clone(),
        vertex_uniforms: ctx.shader(Stage::Vertex).uniform_table().to_vec(),
        pixel_uniforms: ctx.shader(Stage::Pixel).uniform_table().to_vec(),
        vertex_samplers: ctx.shader(Stage::Vertex).sampler_table().to_vec(),
        pixel_samplers: ctx.shader(Stage::Pixel).sampler_table().to_vec(),
        interpolator_channels: ctx.interpolator_channel_count(),
        needs_screen_position: ctx.needs_screen_position(),
        register_count: ctx.register_count(),
    }
}
