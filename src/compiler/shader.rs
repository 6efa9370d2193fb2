//! Per-stage source-text accumulator.
//!
//! One `Shader` exists per stage. It owns the growing section texts
//! (uniforms, inputs, outputs, body), the variable-name allocator, the
//! lexical scope stack used for branch capture, and the declared-symbol
//! tables that deduplicate uniforms, vertex inputs and sampler slots.

use std::collections::{HashMap, HashSet};

use crate::compiler::program::{SamplerBinding, UniformBinding};
use crate::compiler::render_state::SamplerStateDesc;
use crate::compiler::types::{Stage, ValueType};

/// A named section of the stage source. Sections are concatenated in this
/// order by `generated_source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Uniform,
    Input,
    Output,
    Body,
}

impl Section {
    fn index(self) -> usize {
        match self {
            Section::Uniform => 0,
            Section::Input => 1,
            Section::Output => 2,
            Section::Body => 3,
        }
    }
}

/// A value declared (or expression-bound) in one shader stage.
///
/// `name` is the generated symbol for declared locals; for expression-bound
/// pins (uniform names, interpolator reads) it holds the read expression.
#[derive(Clone, Debug)]
pub struct Variable {
    pub name: String,
    pub ty: ValueType,
    pub stage: Stage,
}

type PinKey = (String, String);

pub struct Shader {
    stage: Stage,
    sections: [String; 4],
    /// Capture buffers; a non-empty stack redirects appends for that section.
    captures: [Vec<String>; 4],
    /// Pin caches, innermost scope last. Lookup walks outward so values
    /// emitted in an enclosing block stay shared; entries created inside a
    /// branch vanish when its scope pops.
    scopes: Vec<HashMap<PinKey, Variable>>,
    var_counter: u32,
    inputs_declared: HashSet<String>,
    uniforms: Vec<UniformBinding>,
    uniform_index: HashMap<String, usize>,
    next_register: u32,
    samplers: Vec<SamplerBinding>,
    sampler_index: HashMap<String, usize>,
}

impl Shader {
    pub fn new(stage: Stage) -> Self {
        Shader {
            stage,
            sections: Default::default(),
            captures: Default::default(),
            scopes: vec![HashMap::new()],
            var_counter: 0,
            inputs_declared: HashSet::new(),
            uniforms: Vec::new(),
            uniform_index: HashMap::new(),
            next_register: 0,
            samplers: Vec::new(),
            sampler_index: HashMap::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// A new symbol, unique within this stage.
    pub fn fresh_variable_name(&mut self) -> String {
        let prefix = match self.stage {
            Stage::Vertex => "v",
            Stage::Pixel => "p",
        };
        let n = self.var_counter;
        self.var_counter += 1;
        format!("{prefix}{n}")
    }

    /// Declare a variable bound to `node_id.pin`, so later consumers of the
    /// same output pin reuse it instead of re-emitting the producer.
    pub fn create_variable(&mut self, node_id: &str, pin: &str, ty: ValueType) -> Variable {
        let var = Variable {
            name: self.fresh_variable_name(),
            ty,
            stage: self.stage,
        };
        self.bind_pin(node_id, pin, var.clone());
        var
    }

    /// An unbound scratch variable.
    pub fn create_temporary_variable(&mut self, ty: ValueType) -> Variable {
        Variable {
            name: self.fresh_variable_name(),
            ty,
            stage: self.stage,
        }
    }

    /// Bind `node_id.pin` to a raw expression instead of a declared local
    /// (uniform names, interpolator reads, pass-throughs).
    pub fn create_outer_variable(
        &mut self,
        node_id: &str,
        pin: &str,
        expr: impl Into<String>,
        ty: ValueType,
    ) -> Variable {
        let var = Variable {
            name: expr.into(),
            ty,
            stage: self.stage,
        };
        self.bind_pin(node_id, pin, var.clone());
        var
    }

    fn bind_pin(&mut self, node_id: &str, pin: &str, var: Variable) {
        self.scopes
            .last_mut()
            .expect("shader always has a root scope")
            .insert((node_id.to_string(), pin.to_string()), var);
    }

    /// Cached variable for an output pin, searching the innermost scope
    /// outward.
    pub fn cached_variable(&self, node_id: &str, pin: &str) -> Option<Variable> {
        let key = (node_id.to_string(), pin.to_string());
        self.scopes.iter().rev().find_map(|s| s.get(&key).cloned())
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "root scope must not be popped");
        self.scopes.pop();
    }

    /// Active text sink for a section: the innermost capture buffer if one
    /// is pushed, the section itself otherwise.
    pub fn stream(&mut self, section: Section) -> &mut String {
        let idx = section.index();
        match self.captures[idx].last_mut() {
            Some(buf) => buf,
            None => &mut self.sections[idx],
        }
    }

    /// Append one line (newline added) to the section's active sink.
    pub fn line(&mut self, section: Section, text: impl AsRef<str>) {
        let sink = self.stream(section);
        sink.push_str(text.as_ref());
        sink.push('\n');
    }

    /// Append one body statement at the entry point's base indent.
    pub fn stmt(&mut self, text: impl AsRef<str>) {
        let sink = self.stream(Section::Body);
        sink.push_str("    ");
        sink.push_str(text.as_ref());
        sink.push('\n');
    }

    pub fn push_output_stream(&mut self, section: Section) {
        self.captures[section.index()].push(String::new());
    }

    pub fn pop_output_stream(&mut self, section: Section) -> String {
        self.captures[section.index()]
            .pop()
            .expect("pop_output_stream without matching push")
    }

    pub fn have_input(&self, semantic: &str) -> bool {
        self.inputs_declared.contains(semantic)
    }

    /// Declare a stage input field once, keyed by semantic name.
    pub fn add_input(&mut self, semantic: &str, decl_line: &str) {
        if self.inputs_declared.insert(semantic.to_string()) {
            self.line(Section::Input, decl_line);
        }
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniform_index.contains_key(name)
    }

    /// Allocate a register range for a named uniform and record it in the
    /// stage's uniform table. Idempotent: a repeated name returns its
    /// original register.
    pub fn add_uniform(&mut self, name: &str, ty: ValueType, array_length: u32) -> u32 {
        if let Some(&idx) = self.uniform_index.get(name) {
            return self.uniforms[idx].register;
        }
        let register = self.next_register;
        self.next_register += ty.register_rows() * array_length.max(1);
        self.uniform_index.insert(name.to_string(), self.uniforms.len());
        self.uniforms.push(UniformBinding {
            name: name.to_string(),
            ty,
            register,
            array_length,
        });
        register
    }

    /// Allocate (or look up) the sampler slot for a texture variable.
    ///
    /// Returns whether this is the first request — the caller must then emit
    /// the sampler declaration — and the assigned slot. The filter/address
    /// snapshot is recorded on first declaration only; later requests keep
    /// the original state.
    pub fn define_sampler_texture(
        &mut self,
        texture_var: &str,
        state: SamplerStateDesc,
    ) -> (bool, u32) {
        if let Some(&idx) = self.sampler_index.get(texture_var) {
            return (false, self.samplers[idx].slot);
        }
        let slot = self.samplers.len() as u32;
        self.sampler_index.insert(texture_var.to_string(), self.samplers.len());
        self.samplers.push(SamplerBinding {
            texture: texture_var.to_string(),
            slot,
            state,
        });
        (true, slot)
    }

    pub fn uniform_table(&self) -> &[UniformBinding] {
        &self.uniforms
    }

    pub fn sampler_table(&self) -> &[SamplerBinding] {
        &self.samplers
    }

    /// Final source text: sections in fixed order wrapped in the stage's
    /// entry-point boilerplate.
    pub fn generated_source(&self) -> String {
        let [uniforms, inputs, outputs, body] = &self.sections;
        let mut out = String::new();

        if !uniforms.is_empty() {
            out.push_str(uniforms);
            out.push('\n');
        }

        match self.stage {
            Stage::Vertex => {
                if !inputs.is_empty() {
                    out.push_str("struct VS_INPUT {\n");
                    out.push_str(inputs);
                    out.push_str("};\n\n");
                }
                out.push_str("struct VS_OUTPUT {\n");
                out.push_str("    float4 Position : POSITION;\n");
                out.push_str(outputs);
                out.push_str("};\n\n");
                if inputs.is_empty() {
                    out.push_str("VS_OUTPUT main() {\n");
                } else {
                    out.push_str("VS_OUTPUT main(VS_INPUT i) {\n");
                }
                out.push_str("    VS_OUTPUT o;\n");
                out.push_str(body);
                out.push_str("    return o;\n");
                out.push_str("}\n");
            }
            Stage::Pixel => {
                if !inputs.is_empty() {
                    out.push_str("struct PS_INPUT {\n");
                    out.push_str(inputs);
                    out.push_str("};\n\n");
                    out.push_str("float4 main(PS_INPUT i) : COLOR0 {\n");
                } else {
                    out.push_str("float4 main() : COLOR0 {\n");
                }
                out.push_str(body);
                out.push_str("}\n");
            }
        }
        out
    }
}

/// Re-indent a captured block one level deeper for splicing inside a
/// control statement.
pub(crate) fn indent_block(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_are_monotonic_and_stage_prefixed() {
        let mut vs = Shader::new(Stage::Vertex);
        let mut ps = Shader::new(Stage::Pixel);
        assert_eq!(vs.fresh_variable_name(), "v0");
        assert_eq!(vs.fresh_variable_name(), "v1");
        assert_eq!(ps.fresh_variable_name(), "p0");
    }

    #[test]
    fn pin_cache_respects_scopes() {
        let mut sh = Shader::new(Stage::Pixel);
        let outer = sh.create_variable("n1", "Output", ValueType::Scalar);
        sh.push_scope();
        // Outer binding stays visible inside the branch scope.
        assert_eq!(
            sh.cached_variable("n1", "Output").unwrap().name,
            outer.name
        );
        let inner = sh.create_variable("n2", "Output", ValueType::Vec2);
        assert_eq!(
            sh.cached_variable("n2", "Output").unwrap().name,
            inner.name
        );
        sh.pop_scope();
        // Branch-local binding is gone once the scope pops.
        assert!(sh.cached_variable("n2", "Output").is_none());
        assert!(sh.cached_variable("n1", "Output").is_some());
    }

    #[test]
    fn output_stream_capture_nests() {
        let mut sh = Shader::new(Stage::Pixel);
        sh.stmt("float p0 = 1.0;");
        sh.push_output_stream(Section::Body);
        sh.stmt("float p1 = 2.0;");
        sh.push_output_stream(Section::Body);
        sh.stmt("float p2 = 3.0;");
        let inner = sh.pop_output_stream(Section::Body);
        let outer = sh.pop_output_stream(Section::Body);
        assert_eq!(inner, "    float p2 = 3.0;\n");
        assert_eq!(outer, "    float p1 = 2.0;\n");
        let src = sh.generated_source();
        assert!(src.contains("float p0 = 1.0;"));
        assert!(!src.contains("p1"));
        assert!(!src.contains("p2"));
    }

    #[test]
    fn uniform_registers_account_for_rows_and_arrays() {
        let mut sh = Shader::new(Stage::Vertex);
        assert_eq!(sh.add_uniform("World", ValueType::Matrix4x4, 0), 0);
        assert_eq!(sh.add_uniform("Tint", ValueType::Vec4, 0), 4);
        assert_eq!(sh.add_uniform("Bones", ValueType::Vec4, 12), 5);
        assert_eq!(sh.add_uniform("After", ValueType::Scalar, 0), 17);
        // Re-adding returns the original register.
        assert_eq!(sh.add_uniform("Tint", ValueType::Vec4, 0), 4);
        assert_eq!(sh.uniform_table().len(), 4);
    }

    #[test]
    fn sampler_slots_deduplicate_by_texture_name() {
        let mut sh = Shader::new(Stage::Pixel);
        let state = SamplerStateDesc::default();
        let (first, slot) = sh.define_sampler_texture("Diffuse", state);
        assert!(first);
        assert_eq!(slot, 0);
        let (again, same_slot) = sh.define_sampler_texture("Diffuse", state);
        assert!(!again);
        assert_eq!(same_slot, 0);
        let (_, next) = sh.define_sampler_texture("Detail", state);
        assert_eq!(next, 1);
    }

    #[test]
    fn input_declarations_are_idempotent() {
        let mut sh = Shader::new(Stage::Vertex);
        sh.add_input("Position", "    float3 Position : POSITION;");
        sh.add_input("Position", "    float3 Position : POSITION;");
        assert!(sh.have_input("Position"));
        let src = sh.generated_source();
        assert_eq!(src.matches("POSITION;").count(), 1);
    }

    #[test]
    fn vertex_boilerplate_wraps_sections() {
        let mut sh = Shader::new(Stage::Vertex);
        sh.add_input("Position", "    float3 Position : POSITION;");
        sh.stmt("o.Position = float4(i.Position, 1.0);");
        let src = sh.generated_source();
        assert!(src.contains("struct VS_INPUT {"));
        assert!(src.contains("VS_OUTPUT main(VS_INPUT i) {"));
        assert!(src.contains("    VS_OUTPUT o;"));
        assert!(src.contains("    return o;"));
    }
}
