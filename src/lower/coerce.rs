//! Implicit conversions between socket value domains.

use super::atom;
use crate::context::ExportContext;
use crate::types::{Expr, SocketType, ValueDomain};

/// Rec. 709 luminance weights, matching the renderer's `luminance`.
pub const LUMINANCE: [f64; 3] = [0.2126, 0.7152, 0.0722];

pub fn luminance(c: [f64; 4]) -> f64 {
    LUMINANCE[0] * c[0] + LUMINANCE[1] * c[1] + LUMINANCE[2] * c[2]
}

/// Convert `expr` from the `from` socket type to the `to` socket type.
///
/// Literals are converted directly; other expressions get wrapped in the
/// matching conversion call. Pairs without a rule are reported and the
/// expression passes through unchanged.
pub fn coerce(ctx: &mut ExportContext<'_>, expr: Expr, from: SocketType, to: SocketType) -> Expr {
    let (src, dst) = (from.domain(), to.domain());
    if src == dst {
        return expr;
    }

    match (src, dst) {
        (ValueDomain::Scalar, ValueDomain::Color) => scalar_to_color(&expr),
        (ValueDomain::Scalar, ValueDomain::Vector) => scalar_to_vector(&expr),
        (ValueDomain::Color, ValueDomain::Scalar) => color_to_scalar(&expr),
        (ValueDomain::Vector, ValueDomain::Scalar) => vector_to_scalar(&expr),
        (ValueDomain::Color, ValueDomain::Vector) => color_to_vector(&expr),
        (ValueDomain::Vector, ValueDomain::Color) => vector_to_color(&expr),
        _ => {
            ctx.report_warning(format!(
                "No conversion from {:?} to {:?} for expression '{}'",
                from, to, expr
            ));
            expr
        }
    }
}

pub fn scalar_to_color(expr: &Expr) -> Expr {
    match expr.as_number() {
        Some(v) => Expr::color([v, v, v, 1.0]),
        None => Expr::new(format!("color({})", expr)),
    }
}

pub fn scalar_to_vector(expr: &Expr) -> Expr {
    match expr.as_number() {
        Some(v) => Expr::vector([v, v, v]),
        None => Expr::new(format!("vec3({})", expr)),
    }
}

pub fn color_to_scalar(expr: &Expr) -> Expr {
    match expr.as_color() {
        Some(c) => Expr::number(luminance(c)),
        None => Expr::new(format!("luminance({})", expr)),
    }
}

pub fn vector_to_scalar(expr: &Expr) -> Expr {
    match expr.as_vector() {
        Some(v) => Expr::number((v[0] + v[1] + v[2]) / 3.0),
        None => Expr::new(format!("avg({})", expr)),
    }
}

pub fn color_to_vector(expr: &Expr) -> Expr {
    match expr.as_color() {
        Some(c) => Expr::vector([c[0], c[1], c[2]]),
        None => Expr::new(format!("{}.rgb", atom(expr))),
    }
}

pub fn vector_to_color(expr: &Expr) -> Expr {
    match expr.as_vector() {
        Some(v) => Expr::color([v[0].max(0.0), v[1].max(0.0), v[2].max(0.0), 1.0]),
        None => {
            let v = atom(expr);
            Expr::new(format!(
                "max(color({v}.x, {v}.y, {v}.z, 1), color(0))",
                v = v
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostScene;
    use crate::settings::ExportSettings;

    #[test]
    fn test_scalar_color_round_trip() {
        let scene = HostScene::default();
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);

        for v in [0.0, 0.25, 0.5, 0.8, 1.0] {
            let color = coerce(&mut ctx, Expr::number(v), SocketType::Value, SocketType::Rgba);
            let back = coerce(&mut ctx, color, SocketType::Rgba, SocketType::Value);
            let back = back.as_number().unwrap();
            assert!((back - v).abs() < 1e-9, "{} -> {}", v, back);
        }
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_textual_coercions() {
        let scene = HostScene::default();
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);
        let tex = Expr::new("tex(uv)");

        assert_eq!(
            coerce(&mut ctx, tex.clone(), SocketType::Rgba, SocketType::Value).as_str(),
            "luminance(tex(uv))"
        );
        assert_eq!(
            coerce(&mut ctx, tex.clone(), SocketType::Rgba, SocketType::Vector).as_str(),
            "tex(uv).rgb"
        );
        assert_eq!(
            coerce(&mut ctx, Expr::new("(a + b)"), SocketType::Value, SocketType::Vector).as_str(),
            "vec3((a + b))"
        );
        assert_eq!(
            coerce(&mut ctx, Expr::new("uvw"), SocketType::Vector, SocketType::Rgba).as_str(),
            "max(color(uvw.x, uvw.y, uvw.z, 1), color(0))"
        );
        assert_eq!(
            coerce(&mut ctx, Expr::new("uvw"), SocketType::Vector, SocketType::Value).as_str(),
            "avg(uvw)"
        );
    }

    #[test]
    fn test_vector_to_color_clamps_literals() {
        assert_eq!(
            vector_to_color(&Expr::vector([-1.0, 0.5, 2.0])).as_color(),
            Some([0.0, 0.5, 2.0, 1.0])
        );
    }

    #[test]
    fn test_int_is_scalar() {
        let scene = HostScene::default();
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);
        let e = Expr::new("entity_id");
        let out = coerce(&mut ctx, e.clone(), SocketType::Int, SocketType::Value);
        assert!(Expr::ptr_eq(&e, &out));
    }

    #[test]
    fn test_unsupported_pair_warns() {
        let scene = HostScene::default();
        let settings = ExportSettings::default();
        let mut ctx = ExportContext::new(&scene, &settings, None);
        let e = Expr::new("x");
        let out = coerce(&mut ctx, e.clone(), SocketType::Other, SocketType::Rgba);
        assert_eq!(out, e);
        assert_eq!(ctx.diagnostics().warning_count(), 1);
    }
}
