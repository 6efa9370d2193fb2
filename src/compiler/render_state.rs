//! Fixed-function render state and sampler state.
//!
//! The render state is populated by the PixelOutput node from its literal
//! parameters; sampler states are snapshotted by the Sampler node on first
//! slot declaration. String parameters are normalized the same way for both.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::dsl::parse_str;

fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    InverseSourceColor,
    SourceAlpha,
    InverseSourceAlpha,
    DestColor,
    InverseDestColor,
    DestAlpha,
    InverseDestAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

pub fn parse_blend_factor(f: &str) -> Result<BlendFactor> {
    let f = normalize_token(f);
    Ok(match f.as_str() {
        "zero" => BlendFactor::Zero,
        "one" => BlendFactor::One,
        "src" | "src-color" | "srccolor" => BlendFactor::SourceColor,
        "inv-src" | "inv-src-color" | "invsrccolor" | "one-minus-src-color" => {
            BlendFactor::InverseSourceColor
        }
        "src-alpha" | "srcalpha" => BlendFactor::SourceAlpha,
        "inv-src-alpha" | "invsrcalpha" | "one-minus-src-alpha" => {
            BlendFactor::InverseSourceAlpha
        }
        "dst" | "dst-color" | "dstcolor" | "destcolor" => BlendFactor::DestColor,
        "inv-dst" | "inv-dst-color" | "invdstcolor" | "invdestcolor"
        | "one-minus-dst-color" => BlendFactor::InverseDestColor,
        "dst-alpha" | "dstalpha" | "destalpha" => BlendFactor::DestAlpha,
        "inv-dst-alpha" | "invdstalpha" | "invdestalpha" | "one-minus-dst-alpha" => {
            BlendFactor::InverseDestAlpha
        }
        other => bail!("unsupported blend factor: {other}"),
    })
}

pub fn parse_blend_operation(op: &str) -> Result<BlendOperation> {
    let op = normalize_token(op);
    Ok(match op.as_str() {
        "add" => BlendOperation::Add,
        "subtract" => BlendOperation::Subtract,
        "reverse-subtract" | "rev-subtract" | "revsubtract" => BlendOperation::ReverseSubtract,
        "min" => BlendOperation::Min,
        "max" => BlendOperation::Max,
        other => bail!("unsupported blend operation: {other}"),
    })
}

pub fn parse_compare_function(f: &str) -> Result<CompareFunction> {
    let f = normalize_token(f);
    Ok(match f.as_str() {
        "never" => CompareFunction::Never,
        "less" => CompareFunction::Less,
        "equal" => CompareFunction::Equal,
        "less-equal" | "lessequal" => CompareFunction::LessEqual,
        "greater" => CompareFunction::Greater,
        "not-equal" | "notequal" => CompareFunction::NotEqual,
        "greater-equal" | "greaterequal" => CompareFunction::GreaterEqual,
        "always" => CompareFunction::Always,
        other => bail!("unsupported depth function: {other}"),
    })
}

pub fn parse_cull_mode(m: &str) -> Result<CullMode> {
    let m = normalize_token(m);
    Ok(match m.as_str() {
        "none" | "off" => CullMode::None,
        "front" => CullMode::Front,
        "back" => CullMode::Back,
        other => bail!("unsupported cull mode: {other}"),
    })
}

/// Accumulated fixed-function state for the compiled program. Written by the
/// PixelOutput emitter; last writer wins.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderState {
    pub blend_enable: bool,
    pub source_blend: BlendFactor,
    pub dest_blend: BlendFactor,
    pub blend_operation: BlendOperation,
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_function: CompareFunction,
    pub stencil_enable: bool,
    pub stencil_reference: u32,
    pub cull_mode: CullMode,
    pub color_write_mask: u8,
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            blend_enable: false,
            source_blend: BlendFactor::One,
            dest_blend: BlendFactor::Zero,
            blend_operation: BlendOperation::Add,
            depth_test_enable: true,
            depth_write_enable: true,
            depth_function: CompareFunction::LessEqual,
            stencil_enable: false,
            stencil_reference: 0,
            cull_mode: CullMode::Back,
            color_write_mask: 0xf,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerLookup {
    Tex2D,
    Tex3D,
    Cube,
}

impl SamplerLookup {
    /// Declaration type of the sampler symbol.
    pub fn sampler_type(self) -> &'static str {
        match self {
            SamplerLookup::Tex2D => "sampler2D",
            SamplerLookup::Tex3D => "sampler3D",
            SamplerLookup::Cube => "samplerCUBE",
        }
    }

    /// Width of the coordinate this lookup consumes.
    pub fn coord_width(self) -> u32 {
        match self {
            SamplerLookup::Tex2D => 2,
            SamplerLookup::Tex3D | SamplerLookup::Cube => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerFilter {
    Point,
    Linear,
    Anisotropic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Wrap,
    Clamp,
    Mirror,
}

/// Filter/address snapshot for one sampler slot, taken when the slot is
/// first declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerStateDesc {
    pub lookup: SamplerLookup,
    pub filter: SamplerFilter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
}

impl Default for SamplerStateDesc {
    fn default() -> Self {
        SamplerStateDesc {
            lookup: SamplerLookup::Tex2D,
            filter: SamplerFilter::Linear,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
        }
    }
}

pub fn parse_sampler_lookup(s: &str) -> Result<SamplerLookup> {
    let s = normalize_token(s);
    Ok(match s.as_str() {
        "2d" | "tex2d" => SamplerLookup::Tex2D,
        "3d" | "tex3d" => SamplerLookup::Tex3D,
        "cube" | "texcube" => SamplerLookup::Cube,
        other => bail!("unsupported sampler lookup: {other}"),
    })
}

pub fn parse_sampler_filter(s: &str) -> Result<SamplerFilter> {
    let s = normalize_token(s);
    Ok(match s.as_str() {
        "point" | "nearest" => SamplerFilter::Point,
        "linear" => SamplerFilter::Linear,
        "anisotropic" => SamplerFilter::Anisotropic,
        other => bail!("unsupported sampler filter: {other}"),
    })
}

pub fn parse_address_mode(s: &str) -> Result<AddressMode> {
    let s = normalize_token(s);
    Ok(match s.as_str() {
        "wrap" | "repeat" => AddressMode::Wrap,
        "clamp" => AddressMode::Clamp,
        "mirror" => AddressMode::Mirror,
        other => bail!("unsupported address mode: {other}"),
    })
}

/// Sampler state from a Sampler node's literal parameters, defaults applied.
pub fn sampler_state_from_params(
    params: &HashMap<String, serde_json::Value>,
) -> Result<SamplerStateDesc> {
    let mut state = SamplerStateDesc::default();
    if let Some(s) = parse_str(params, "Lookup") {
        state.lookup = parse_sampler_lookup(s)?;
    }
    if let Some(s) = parse_str(params, "Filter") {
        state.filter = parse_sampler_filter(s)?;
    }
    if let Some(s) = parse_str(params, "AddressU") {
        state.address_u = parse_address_mode(s)?;
    }
    if let Some(s) = parse_str(params, "AddressV") {
        state.address_v = parse_address_mode(s)?;
    }
    Ok(state)
}
