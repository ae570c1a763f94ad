//! The expression IR produced by node lowering.

use serde::{Serialize, Serializer};
use std::fmt;
use std::rc::Rc;

/// An immutable expression in the Ignis shading language.
///
/// Cloning is cheap (reference counted), which lets the lowering cache hand out
/// the very same allocation for repeated lookups of one socket.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Expr(Rc<str>);

impl Expr {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(Rc::from(text.as_ref()))
    }

    /// A numeric literal.
    pub fn number(value: f64) -> Self {
        Self::new(fmt_num(value))
    }

    /// A `vec3(x, y, z)` literal.
    pub fn vector(v: [f64; 3]) -> Self {
        Self::new(format!(
            "vec3({}, {}, {})",
            fmt_num(v[0]),
            fmt_num(v[1]),
            fmt_num(v[2])
        ))
    }

    /// A `color(r, g, b, a)` literal.
    pub fn color(c: [f64; 4]) -> Self {
        Self::new(format!(
            "color({}, {}, {}, {})",
            fmt_num(c[0]),
            fmt_num(c[1]),
            fmt_num(c[2]),
            fmt_num(c[3])
        ))
    }

    /// Opaque black, used whenever "no contribution" must be spelled out.
    pub fn black() -> Self {
        Self::new("color(0)")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the expression as a plain number literal.
    pub fn as_number(&self) -> Option<f64> {
        parse_number(&self.0)
    }

    /// Parse the expression as a `vec3(...)` literal.
    pub fn as_vector(&self) -> Option<[f64; 3]> {
        let args = parse_call(&self.0, "vec3")?;
        match args.as_slice() {
            [v] => Some([*v, *v, *v]),
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    /// Parse the expression as a `color(...)` literal.
    pub fn as_color(&self) -> Option<[f64; 4]> {
        let args = parse_call(&self.0, "color")?;
        match args.as_slice() {
            [v] => Some([*v, *v, *v, 1.0]),
            [r, g, b] => Some([*r, *g, *b, 1.0]),
            [r, g, b, a] => Some([*r, *g, *b, *a]),
            _ => None,
        }
    }

    /// True if the expression is a literal the exporter can evaluate itself.
    pub fn is_constant(&self) -> bool {
        self.as_number().is_some() || self.as_vector().is_some() || self.as_color().is_some()
    }

    /// Evaluate a literal down to one number, or fall back to `default`.
    ///
    /// Colors and vectors count as constant only if all channels agree.
    pub fn try_extract(&self, default: f64) -> f64 {
        if let Some(v) = self.as_number() {
            return v;
        }
        if let Some(c) = self.as_color() {
            if c[0] == c[1] && c[1] == c[2] {
                return c[0];
            }
        }
        if let Some(v) = self.as_vector() {
            if v[0] == v[1] && v[1] == v[2] {
                return v[0];
            }
        }
        default
    }

    /// Check whether two expressions share the same allocation.
    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Convert into a JSON scene parameter.
    ///
    /// Literals become numbers or RGB arrays, everything else stays an
    /// expression string.
    pub fn to_param(&self) -> serde_json::Value {
        if let Some(v) = self.as_number() {
            if let Some(n) = serde_json::Number::from_f64(v) {
                return serde_json::Value::Number(n);
            }
        }
        if let Some(c) = self.as_color() {
            return serde_json::json!([c[0], c[1], c[2]]);
        }
        if let Some(v) = self.as_vector() {
            return serde_json::json!([v[0], v[1], v[2]]);
        }
        serde_json::Value::String(self.0.to_string())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({:?})", &*self.0)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Self(Rc::from(s))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_param().serialize(serializer)
    }
}

/// Format a number the way the expression language expects it.
pub fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    format!("{}", value)
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '.') {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_call(text: &str, func: &str) -> Option<Vec<f64>> {
    let inner = text
        .trim()
        .strip_prefix(func)?
        .strip_prefix('(')?
        .strip_suffix(')')?;
    inner.split(',').map(parse_number).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(Expr::number(1.0).as_str(), "1");
        assert_eq!(Expr::number(0.5).as_str(), "0.5");
        assert_eq!(Expr::number(-0.0).as_str(), "0");
        assert_eq!(Expr::number(f64::NAN).as_str(), "0");
    }

    #[test]
    fn test_literal_parsing() {
        assert_eq!(Expr::number(2.5).as_number(), Some(2.5));
        assert_eq!(Expr::new("Pi").as_number(), None);
        assert_eq!(Expr::new("(a + 1)").as_number(), None);
        assert_eq!(
            Expr::vector([1.0, 2.0, 3.0]).as_vector(),
            Some([1.0, 2.0, 3.0])
        );
        assert_eq!(
            Expr::color([0.1, 0.2, 0.3, 1.0]).as_color(),
            Some([0.1, 0.2, 0.3, 1.0])
        );
        assert_eq!(Expr::black().as_color(), Some([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(Expr::new("color(0.5)").as_color(), Some([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(Expr::new("color(a, 1, 1, 1)").as_color(), None);
    }

    #[test]
    fn test_try_extract() {
        assert_eq!(Expr::number(0.25).try_extract(1.0), 0.25);
        assert_eq!(Expr::color([0.5, 0.5, 0.5, 1.0]).try_extract(1.0), 0.5);
        assert_eq!(Expr::color([0.5, 0.1, 0.5, 1.0]).try_extract(-1.0), -1.0);
        assert_eq!(Expr::new("uvw").try_extract(7.0), 7.0);
    }

    #[test]
    fn test_to_param() {
        assert_eq!(Expr::number(3.0).to_param(), serde_json::json!(3.0));
        assert_eq!(
            Expr::color([1.0, 0.0, 0.5, 1.0]).to_param(),
            serde_json::json!([1.0, 0.0, 0.5])
        );
        assert_eq!(
            Expr::new("tex(uvw)").to_param(),
            serde_json::json!("tex(uvw)")
        );
    }

    #[test]
    fn test_clone_shares_allocation() {
        let a = Expr::new("noise(uvw)");
        let b = a.clone();
        assert!(Expr::ptr_eq(&a, &b));
        assert!(!Expr::ptr_eq(&a, &Expr::new("noise(uvw)")));
    }
}
