//! Shader-graph-to-source compiler backend.
//!
//! Takes a directed graph of typed nodes (the editor's JSON DSL or an
//! in-memory [`dsl::ShaderGraph`]) and compiles it into a vertex program and
//! a pixel program in an HLSL-flavored shading language, together with the
//! render state, uniform/sampler tables and interpolator layout the runtime
//! needs to bind them.

pub mod compiler;
pub mod dsl;

pub use compiler::{CompiledProgram, compile};
