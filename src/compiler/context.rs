//! Compile-wide emission state: both stage shaders, pull-based pin
//! resolution, interpolator/boolean-register allocation and the render-state
//! accumulator.
//!
//! The stage a value is emitted in is always an explicit parameter on the
//! emission calls; there is no mutable "current stage". A nested stage
//! switch (the Interpolator emitting its subtree vertex-side while pixel
//! emission is in flight) is just a call with a different argument.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow, bail};

use crate::compiler::render_state::RenderState;
use crate::compiler::shader::{Section, Shader, Variable};
use crate::compiler::types::{Stage, ValueType};
use crate::dsl::{Node, ShaderGraph, find_node, incoming_connection};

pub struct Context<'g> {
    graph: &'g ShaderGraph,
    nodes_by_id: HashMap<String, Node>,
    vertex: Shader,
    pixel: Shader,
    /// Nodes currently being emitted, per stage. The upstream validator
    /// rejects cyclic graphs, but an accidental cycle must fail cleanly
    /// here rather than overflow the call stack.
    visiting: HashSet<(String, Stage)>,
    /// Components used per interpolator channel, in allocation order.
    channels: Vec<u32>,
    boolean_registers: u32,
    needs_screen_position: bool,
    register_count: u32,
    render_state: RenderState,
}

impl<'g> Context<'g> {
    pub fn new(graph: &'g ShaderGraph) -> Self {
        Context {
            graph,
            nodes_by_id: graph.nodes_by_id(),
            vertex: Shader::new(Stage::Vertex),
            pixel: Shader::new(Stage::Pixel),
            visiting: HashSet::new(),
            channels: Vec::new(),
            boolean_registers: 0,
            needs_screen_position: false,
            register_count: 0,
            render_state: RenderState::default(),
        }
    }

    pub fn shader(&self, stage: Stage) -> &Shader {
        match stage {
            Stage::Vertex => &self.vertex,
            Stage::Pixel => &self.pixel,
        }
    }

    pub fn shader_mut(&mut self, stage: Stage) -> &mut Shader {
        match stage {
            Stage::Vertex => &mut self.vertex,
            Stage::Pixel => &mut self.pixel,
        }
    }

    /// Resolve the edge feeding `pin` on `node` and return the producer's
    /// output variable in `stage`, emitting the producer first if its output
    /// is not already cached there.
    ///
    /// `Ok(None)` means the pin is unconnected; emitters with a documented
    /// default synthesize it, emitters with a mandatory pin escalate to a
    /// missing-input failure.
    pub fn emit_input(
        &mut self,
        node: &Node,
        pin: &str,
        stage: Stage,
    ) -> Result<Option<Variable>> {
        let Some(conn) = incoming_connection(self.graph, &node.id, pin) else {
            return Ok(None);
        };
        let producer_id = conn.from.node_id.clone();
        let out_pin = conn.from.port_id.clone();

        if let Some(var) = self.shader(stage).cached_variable(&producer_id, &out_pin) {
            return Ok(Some(var));
        }

        let key = (producer_id.clone(), stage);
        if !self.visiting.insert(key.clone()) {
            bail!("cycle detected while emitting {producer_id}.{out_pin}");
        }
        let producer = find_node(&self.nodes_by_id, &producer_id)?.clone();
        let emitted = super::emit_node(self, &producer, stage);
        self.visiting.remove(&key);
        emitted?;

        let var = self
            .shader(stage)
            .cached_variable(&producer_id, &out_pin)
            .ok_or_else(|| {
                anyhow!(
                    "{} has no output pin {out_pin}",
                    producer.node_type
                )
            })?;
        Ok(Some(var))
    }

    /// Allocate the cached output variable for `node.pin` in `stage`.
    pub fn emit_output(&mut self, node: &Node, pin: &str, ty: ValueType, stage: Stage) -> Variable {
        self.shader_mut(stage).create_variable(&node.id, pin, ty)
    }

    /// Run `f` with the stage's body redirected into an isolated buffer and
    /// a fresh pin-cache scope, returning the captured text alongside `f`'s
    /// result. The buffer and scope are released on every exit path, so a
    /// failing branch cannot leave emission redirected.
    pub fn capture_branch<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce(&mut Context<'g>) -> Result<T>,
    ) -> Result<(String, T)> {
        let shader = self.shader_mut(stage);
        shader.push_scope();
        shader.push_output_stream(Section::Body);
        let result = f(self);
        let shader = self.shader_mut(stage);
        let text = shader.pop_output_stream(Section::Body);
        shader.pop_scope();
        Ok((text, result?))
    }

    /// First-fit interpolator allocation into 4-wide channels: a request
    /// either extends the open channel or opens a new one.
    pub fn allocate_interpolator(&mut self, width: u32) -> (u32, u32, bool) {
        debug_assert!((1..=4).contains(&width));
        if let Some(used) = self.channels.last_mut() {
            if *used + width <= 4 {
                let offset = *used;
                *used += width;
                return (self.channels.len() as u32 - 1, offset, false);
            }
        }
        self.channels.push(width);
        (self.channels.len() as u32 - 1, 0, true)
    }

    pub fn interpolator_channel_count(&self) -> u32 {
        self.channels.len() as u32
    }

    pub fn allocate_boolean_register(&mut self) -> u32 {
        let reg = self.boolean_registers;
        self.boolean_registers += 1;
        reg
    }

    pub fn boolean_register_count(&self) -> u32 {
        self.boolean_registers
    }

    pub fn mark_screen_position_used(&mut self) {
        self.needs_screen_position = true;
    }

    pub fn needs_screen_position(&self) -> bool {
        self.needs_screen_position
    }

    pub fn set_register_count(&mut self, n: u32) {
        self.register_count = n;
    }

    pub fn register_count(&self) -> u32 {
        self.register_count
    }

    pub fn render_state_mut(&mut self) -> &mut RenderState {
        &mut self.render_state
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_graph() -> ShaderGraph {
        ShaderGraph {
            version: "1.0".to_string(),
            name: None,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    #[test]
    fn interpolator_channels_pack_first_fit() {
        let graph = empty_graph();
        let mut ctx = Context::new(&graph);
        assert_eq!(ctx.allocate_interpolator(3), (0, 0, true));
        // One component left in channel 0.
        assert_eq!(ctx.allocate_interpolator(1), (0, 3, false));
        assert_eq!(ctx.allocate_interpolator(2), (1, 0, true));
        assert_eq!(ctx.allocate_interpolator(2), (1, 2, false));
        assert_eq!(ctx.allocate_interpolator(4), (2, 0, true));
        assert_eq!(ctx.interpolator_channel_count(), 3);
    }

    #[test]
    fn closed_channels_are_not_revisited() {
        let graph = empty_graph();
        let mut ctx = Context::new(&graph);
        ctx.allocate_interpolator(3);
        // Width 2 does not fit channel 0; opens channel 1.
        assert_eq!(ctx.allocate_interpolator(2), (1, 0, true));
        // Width 1 would fit channel 0's leftover, but only the open channel
        // is extended.
        assert_eq!(ctx.allocate_interpolator(1), (1, 2, false));
    }

    #[test]
    fn capture_branch_releases_on_error() {
        let graph = empty_graph();
        let mut ctx = Context::new(&graph);
        let result: Result<()> = ctx
            .capture_branch(Stage::Pixel, |ctx| -> Result<()> {
                ctx.shader_mut(Stage::Pixel).stmt("float p0 = 1.0;");
                bail!("branch failed")
            })
            .map(|_| ());
        assert!(result.is_err());
        // Emission is back on the main body and the scope stack is balanced.
        ctx.shader_mut(Stage::Pixel).stmt("float p1 = 2.0;");
        let src = ctx.shader(Stage::Pixel).generated_source();
        assert!(src.contains("p1"));
        assert!(!src.contains("p0"));
    }

    #[test]
    fn boolean_registers_count_up() {
        let graph = empty_graph();
        let mut ctx = Context::new(&graph);
        assert_eq!(ctx.allocate_boolean_register(), 0);
        assert_eq!(ctx.allocate_boolean_register(), 1);
        assert_eq!(ctx.boolean_register_count(), 2);
    }
}
