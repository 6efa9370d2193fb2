//! Value types of the shading language and the widening/cast rules between
//! them.

use anyhow::{Result, bail};

/// Type of a value flowing through the graph.
///
/// The widenable types are ordered `Void < Scalar < Vec2 < Vec3 < Vec4`;
/// `Matrix4x4` and `Texture` sit outside the ordering and never widen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Matrix4x4,
    Texture,
}

/// The shader stage a value was declared in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Pixel,
}

impl ValueType {
    /// Source-text name of this type.
    pub fn hlsl(self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Scalar => "float",
            ValueType::Vec2 => "float2",
            ValueType::Vec3 => "float3",
            ValueType::Vec4 => "float4",
            ValueType::Matrix4x4 => "float4x4",
            ValueType::Texture => "texture",
        }
    }

    /// Component count for widenable types; `None` for matrix/texture.
    pub fn width(self) -> Option<u32> {
        match self {
            ValueType::Void => Some(0),
            ValueType::Scalar => Some(1),
            ValueType::Vec2 => Some(2),
            ValueType::Vec3 => Some(3),
            ValueType::Vec4 => Some(4),
            ValueType::Matrix4x4 | ValueType::Texture => None,
        }
    }

    pub fn with_width(width: u32) -> Result<ValueType> {
        Ok(match width {
            0 => ValueType::Void,
            1 => ValueType::Scalar,
            2 => ValueType::Vec2,
            3 => ValueType::Vec3,
            4 => ValueType::Vec4,
            other => bail!("no value type with {other} components"),
        })
    }

    /// Widest of two operand types under the widening order.
    pub fn widest(a: ValueType, b: ValueType) -> Result<ValueType> {
        let (Some(wa), Some(wb)) = (a.width(), b.width()) else {
            bail!(
                "cannot combine {} and {} in arithmetic",
                a.hlsl(),
                b.hlsl()
            );
        };
        ValueType::with_width(wa.max(wb))
    }

    /// Uniform register rows occupied by one element of this type.
    pub fn register_rows(self) -> u32 {
        match self {
            ValueType::Matrix4x4 => 4,
            _ => 1,
        }
    }

    /// Zero literal of this type, used to initialize loop accumulators.
    pub fn zero_literal(self) -> Result<String> {
        Ok(match self {
            ValueType::Scalar => "0.0".to_string(),
            ValueType::Vec2 => "float2(0.0, 0.0)".to_string(),
            ValueType::Vec3 => "float3(0.0, 0.0, 0.0)".to_string(),
            ValueType::Vec4 => "float4(0.0, 0.0, 0.0, 0.0)".to_string(),
            other => bail!("no zero literal for {}", other.hlsl()),
        })
    }
}

/// Cast `expr` from `from` up to `to`.
///
/// Same type is a no-op (the expression is returned untouched). A scalar
/// broadcasts into every component; a narrower vector zero-pads the missing
/// components. Narrowing and matrix/texture casts fail.
pub fn cast_expr(expr: &str, from: ValueType, to: ValueType) -> Result<String> {
    if from == to {
        return Ok(expr.to_string());
    }
    let (Some(wf), Some(wt)) = (from.width(), to.width()) else {
        bail!("cannot cast {} to {}", from.hlsl(), to.hlsl());
    };
    if wf == 0 || wf > wt {
        bail!("cannot cast {} to {}", from.hlsl(), to.hlsl());
    }
    if from == ValueType::Scalar {
        let parts = vec![expr; wt as usize];
        return Ok(format!("{}({})", to.hlsl(), parts.join(", ")));
    }
    let mut parts = vec![expr.to_string()];
    for _ in wf..wt {
        parts.push("0.0".to_string());
    }
    Ok(format!("{}({})", to.hlsl(), parts.join(", ")))
}

/// Cast `expr` to a 4-wide homogeneous position: missing components pad with
/// zero, the w component with 1.0.
pub fn cast_to_position(expr: &str, from: ValueType) -> Result<String> {
    Ok(match from {
        ValueType::Scalar => format!("float4({expr}, 0.0, 0.0, 1.0)"),
        ValueType::Vec2 => format!("float4({expr}, 0.0, 1.0)"),
        ValueType::Vec3 => format!("float4({expr}, 1.0)"),
        ValueType::Vec4 => expr.to_string(),
        other => bail!("cannot write {} as a position", other.hlsl()),
    })
}

/// Cast `expr` to a 4-wide color: a scalar broadcasts across rgb, missing
/// components pad with zero, alpha with 1.0.
pub fn cast_to_color(expr: &str, from: ValueType) -> Result<String> {
    Ok(match from {
        ValueType::Scalar => format!("float4({expr}, {expr}, {expr}, 1.0)"),
        ValueType::Vec2 => format!("float4({expr}, 0.0, 1.0)"),
        ValueType::Vec3 => format!("float4({expr}, 1.0)"),
        ValueType::Vec4 => expr.to_string(),
        other => bail!("cannot write {} as a color", other.hlsl()),
    })
}

/// Format a float literal, removing trailing zeros but keeping a decimal
/// point so the literal stays a float in the target language.
pub fn fmt_f32(v: f32) -> String {
    if v.is_finite() {
        let s = format!("{v:.9}");
        let s = s.trim_end_matches('0');
        if s.ends_with('.') {
            format!("{s}0")
        } else {
            s.to_string()
        }
    } else {
        "0.0".to_string()
    }
}
