//! Socket data types and constant socket values.

use super::Expr;
use serde::{Deserialize, Serialize};

/// Declared data type of a node socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketType {
    Value,
    Int,
    Boolean,
    Vector,
    Rgba,
    Shader,
    #[serde(other)]
    Other,
}

impl SocketType {
    /// The coarse value domain used by the coercion table.
    pub fn domain(self) -> ValueDomain {
        match self {
            SocketType::Value | SocketType::Int | SocketType::Boolean => ValueDomain::Scalar,
            SocketType::Vector => ValueDomain::Vector,
            SocketType::Rgba => ValueDomain::Color,
            SocketType::Shader => ValueDomain::Shader,
            SocketType::Other => ValueDomain::Unknown,
        }
    }

    /// The zero value of this type, as a literal expression.
    pub fn zero(self) -> Expr {
        match self.domain() {
            ValueDomain::Scalar | ValueDomain::Unknown => Expr::number(0.0),
            ValueDomain::Vector => Expr::vector([0.0; 3]),
            ValueDomain::Color | ValueDomain::Shader => Expr::black(),
        }
    }
}

/// Value domains the expression language distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDomain {
    Scalar,
    Vector,
    Color,
    Shader,
    Unknown,
}

/// A constant default value stored on an unlinked socket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SocketValue {
    Scalar(f64),
    Vector([f64; 3]),
    Color([f64; 4]),
}

impl SocketValue {
    /// Lower the constant according to the socket's declared type.
    ///
    /// A value stored with a different shape than declared (e.g. a 4-component
    /// array on a vector socket) is reshaped rather than rejected.
    pub fn to_expr(self, ty: SocketType) -> Expr {
        match (ty.domain(), self) {
            (ValueDomain::Vector, SocketValue::Vector(v)) => Expr::vector(v),
            (ValueDomain::Vector, SocketValue::Color(c)) => Expr::vector([c[0], c[1], c[2]]),
            (ValueDomain::Vector, SocketValue::Scalar(s)) => Expr::vector([s, s, s]),
            (ValueDomain::Color, SocketValue::Color(c)) => Expr::color(c),
            (ValueDomain::Color, SocketValue::Vector(v)) => Expr::color([v[0], v[1], v[2], 1.0]),
            (ValueDomain::Color, SocketValue::Scalar(s)) => Expr::color([s, s, s, 1.0]),
            (_, SocketValue::Scalar(s)) => Expr::number(s),
            (_, SocketValue::Vector(v)) => Expr::vector(v),
            (_, SocketValue::Color(c)) => Expr::color(c),
        }
    }

    /// Check whether the value is black / zero in every color channel.
    pub fn is_black(self) -> bool {
        match self {
            SocketValue::Scalar(s) => s == 0.0,
            SocketValue::Vector(v) => v.iter().all(|c| *c == 0.0),
            SocketValue::Color(c) => c[..3].iter().all(|c| *c == 0.0),
        }
    }

    pub fn as_scalar(self) -> Option<f64> {
        match self {
            SocketValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// RGB triple of the value (scalars broadcast).
    pub fn rgb(self) -> [f64; 3] {
        match self {
            SocketValue::Scalar(s) => [s, s, s],
            SocketValue::Vector(v) => v,
            SocketValue::Color(c) => [c[0], c[1], c[2]],
        }
    }
}
