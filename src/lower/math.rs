//! Math, vector math, clamp and map range nodes.

use super::{atom, fold1, fold2, fold3, pexpr, LowerResult, NodeRef};
use crate::context::ExportContext;
use crate::host::{
    ClampNode, ClampType, MapRangeDataType, MapRangeInterpolation, MapRangeNode, MathNode,
    MathOperation, VectorMathNode, VectorMathOperation,
};
use crate::types::Expr;

fn unary(a: &Expr, f: impl Fn(f64) -> f64, text: impl FnOnce(&Expr) -> Expr) -> Expr {
    fold1(a, f).unwrap_or_else(|| text(a))
}

fn binary(
    a: &Expr,
    b: &Expr,
    f: impl Fn(f64, f64) -> f64,
    text: impl FnOnce(&Expr, &Expr) -> Expr,
) -> Expr {
    fold2(a, b, f).unwrap_or_else(|| text(a, b))
}

fn ternary(
    a: &Expr,
    b: &Expr,
    c: &Expr,
    f: impl Fn(f64, f64, f64) -> f64,
    text: impl FnOnce(&Expr, &Expr, &Expr) -> Expr,
) -> Expr {
    fold3(a, b, c, f).unwrap_or_else(|| text(a, b, c))
}

fn func1(name: &str, a: &Expr) -> Expr {
    pexpr!("{}({})", name, a)
}

fn func2(name: &str, a: &Expr, b: &Expr) -> Expr {
    pexpr!("{}({}, {})", name, a, b)
}

fn infix(op: &str, a: &Expr, b: &Expr) -> Expr {
    pexpr!("({} {} {})", atom(a), op, atom(b))
}

fn smooth_min(a: f64, b: f64, c: f64) -> f64 {
    if c != 0.0 {
        let h = (c - (a - b).abs()).max(0.0) / c;
        a.min(b) - h * h * h * c / 6.0
    } else {
        a.min(b)
    }
}

fn wrap(value: f64, max: f64, min: f64) -> f64 {
    let range = max - min;
    if range != 0.0 {
        value - range * ((value - min) / range).floor()
    } else {
        min
    }
}

fn snap(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        (a / b).floor() * b
    } else {
        0.0
    }
}

fn pingpong(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        (wrap(a - b, 2.0 * b, 0.0) - b).abs()
    } else {
        0.0
    }
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b != 0.0 {
        a / b
    } else {
        0.0
    }
}

fn arity(op: MathOperation) -> usize {
    use MathOperation::*;
    match op {
        MultiplyAdd | Compare | SmoothMin | SmoothMax | Wrap => 3,
        Add | Subtract | Multiply | Divide | Power | Logarithm | Minimum | Maximum | LessThan
        | GreaterThan | Modulo | FlooredModulo | Snap | Pingpong | Arctan2 => 2,
        _ => 1,
    }
}

/// Scalar operation over already lowered operands, `None` if unsupported.
fn scalar_op(op: MathOperation, args: &[Expr]) -> Option<Expr> {
    use MathOperation::*;
    let a = args.first()?;
    let b = args.get(1).unwrap_or(a);
    let c = args.get(2).unwrap_or(a);

    Some(match op {
        Add => binary(a, b, |a, b| a + b, |a, b| infix("+", a, b)),
        Subtract => binary(a, b, |a, b| a - b, |a, b| infix("-", a, b)),
        Multiply => binary(a, b, |a, b| a * b, |a, b| infix("*", a, b)),
        Divide => binary(a, b, safe_div, |a, b| infix("/", a, b)),
        MultiplyAdd => ternary(
            a,
            b,
            c,
            |a, b, c| a * b + c,
            |a, b, c| pexpr!("({} * {} + {})", atom(a), atom(b), atom(c)),
        ),
        Power => binary(a, b, f64::powf, |a, b| func2("pow", a, b)),
        Logarithm => binary(
            a,
            b,
            |a, b| {
                if a > 0.0 && b > 0.0 && b != 1.0 {
                    a.ln() / b.ln()
                } else {
                    0.0
                }
            },
            |a, b| pexpr!("(log({}) / log({}))", a, b),
        ),
        Sqrt => unary(a, |a| if a > 0.0 { a.sqrt() } else { 0.0 }, |a| func1("sqrt", a)),
        InverseSqrt => unary(
            a,
            |a| if a > 0.0 { 1.0 / a.sqrt() } else { 0.0 },
            |a| pexpr!("(1 / sqrt({}))", a),
        ),
        Absolute => unary(a, f64::abs, |a| func1("abs", a)),
        Exponent => unary(a, f64::exp, |a| func1("exp", a)),
        Minimum => binary(a, b, f64::min, |a, b| func2("min", a, b)),
        Maximum => binary(a, b, f64::max, |a, b| func2("max", a, b)),
        LessThan => binary(
            a,
            b,
            |a, b| if a < b { 1.0 } else { 0.0 },
            |a, b| pexpr!("select({} < {}, 1, 0)", atom(a), atom(b)),
        ),
        GreaterThan => binary(
            a,
            b,
            |a, b| if a > b { 1.0 } else { 0.0 },
            |a, b| pexpr!("select({} > {}, 1, 0)", atom(a), atom(b)),
        ),
        Sign => unary(
            a,
            |a| if a == 0.0 { 0.0 } else { a.signum() },
            |a| func1("sign", a),
        ),
        Compare => ternary(
            a,
            b,
            c,
            |a, b, c| if (a - b).abs() <= c.max(1e-5) { 1.0 } else { 0.0 },
            |a, b, c| pexpr!("select(abs({} - {}) <= max({}, 1e-5), 1, 0)", atom(a), atom(b), c),
        ),
        SmoothMin => ternary(a, b, c, smooth_min, |a, b, c| pexpr!("smin({}, {}, {})", a, b, c)),
        SmoothMax => ternary(
            a,
            b,
            c,
            |a, b, c| -smooth_min(-a, -b, c),
            |a, b, c| pexpr!("smax({}, {}, {})", a, b, c),
        ),
        Round => unary(a, f64::round, |a| func1("round", a)),
        Floor => unary(a, f64::floor, |a| func1("floor", a)),
        Ceil => unary(a, f64::ceil, |a| func1("ceil", a)),
        Trunc => unary(a, f64::trunc, |a| func1("trunc", a)),
        Fract => unary(a, |a| a - a.floor(), |a| func1("fract", a)),
        Modulo => binary(
            a,
            b,
            |a, b| if b != 0.0 { a % b } else { 0.0 },
            |a, b| func2("fmod", a, b),
        ),
        FlooredModulo => binary(
            a,
            b,
            |a, b| if b != 0.0 { a - (a / b).floor() * b } else { 0.0 },
            |a, b| {
                let (a, b) = (atom(a), atom(b));
                pexpr!("({} - floor({} / {}) * {})", a, a, b, b)
            },
        ),
        Wrap => ternary(a, b, c, wrap, |a, b, c| pexpr!("wrap({}, {}, {})", a, b, c)),
        Snap => binary(a, b, snap, |a, b| func2("snap", a, b)),
        Pingpong => binary(a, b, pingpong, |a, b| func2("pingpong", a, b)),
        Sine => unary(a, f64::sin, |a| func1("sin", a)),
        Cosine => unary(a, f64::cos, |a| func1("cos", a)),
        Tangent => unary(a, f64::tan, |a| func1("tan", a)),
        Arcsine => unary(a, |a| a.clamp(-1.0, 1.0).asin(), |a| func1("asin", a)),
        Arccosine => unary(a, |a| a.clamp(-1.0, 1.0).acos(), |a| func1("acos", a)),
        Arctangent => unary(a, f64::atan, |a| func1("atan", a)),
        Arctan2 => binary(a, b, f64::atan2, |a, b| func2("atan2", a, b)),
        Sinh => unary(a, f64::sinh, |a| pexpr!("((exp({x}) - exp(-{x})) / 2)", x = atom(a))),
        Cosh => unary(a, f64::cosh, |a| pexpr!("((exp({x}) + exp(-{x})) / 2)", x = atom(a))),
        Tanh => unary(a, f64::tanh, |a| {
            pexpr!(
                "((exp({x}) - exp(-{x})) / (exp({x}) + exp(-{x})))",
                x = atom(a)
            )
        }),
        Radians => unary(a, f64::to_radians, |a| func1("rad", a)),
        Degrees => unary(a, f64::to_degrees, |a| func1("deg", a)),
        Unsupported => return None,
    })
}

/// Clamp a scalar to `[0, 1]`, folding literals.
pub(super) fn saturate(e: Expr) -> Expr {
    match e.as_number() {
        Some(v) => Expr::number(v.clamp(0.0, 1.0)),
        None => pexpr!("clamp({}, 0, 1)", e),
    }
}

pub(super) fn math(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &MathNode) -> LowerResult {
    let op = props.operation;
    if op == MathOperation::Unsupported {
        return Err(n.unsupported_operation(op));
    }

    let mut args = Vec::with_capacity(3);
    for i in 0..arity(op) {
        args.push(n.input_at(ctx, i)?);
    }
    let e = scalar_op(op, &args).ok_or_else(|| n.unsupported_operation(op))?;

    Ok(if props.use_clamp { saturate(e) } else { e })
}

// Vector math

fn vec_binary(
    a: &Expr,
    b: &Expr,
    f: impl Fn(f64, f64) -> f64,
    text: impl FnOnce(&Expr, &Expr) -> Expr,
) -> Expr {
    match (a.as_vector(), b.as_vector()) {
        (Some(x), Some(y)) => Expr::vector([f(x[0], y[0]), f(x[1], y[1]), f(x[2], y[2])]),
        _ => text(a, b),
    }
}

fn vec_unary(a: &Expr, f: impl Fn(f64) -> f64, text: impl FnOnce(&Expr) -> Expr) -> Expr {
    match a.as_vector() {
        Some(x) => Expr::vector([f(x[0]), f(x[1]), f(x[2])]),
        None => text(a),
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Vector math result: either a vector or a scalar output.
enum VecResult {
    Vector(Expr),
    Value(Expr),
}

pub(super) fn vector_math(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &VectorMathNode,
    output: &str,
) -> LowerResult {
    use VectorMathOperation::*;
    let op = props.operation;

    let a = n.input_at(ctx, 0)?;
    let needs_b = !matches!(
        op,
        Length | Normalize | Absolute | Floor | Ceil | Fraction | Sine | Cosine | Tangent | Scale
    );
    let b = if needs_b { n.input_at(ctx, 1)? } else { a.clone() };
    let needs_c = matches!(op, MultiplyAdd | Faceforward | Wrap);
    let c = if needs_c { n.input_at(ctx, 2)? } else { a.clone() };

    let result = match op {
        Add => VecResult::Vector(vec_binary(&a, &b, |x, y| x + y, |a, b| infix("+", a, b))),
        Subtract => VecResult::Vector(vec_binary(&a, &b, |x, y| x - y, |a, b| infix("-", a, b))),
        Multiply => VecResult::Vector(vec_binary(&a, &b, |x, y| x * y, |a, b| infix("*", a, b))),
        Divide => VecResult::Vector(vec_binary(&a, &b, safe_div, |a, b| infix("/", a, b))),
        MultiplyAdd => VecResult::Vector(pexpr!("({} * {} + {})", atom(&a), atom(&b), atom(&c))),
        CrossProduct => VecResult::Vector(func2("cross", &a, &b)),
        Project => VecResult::Vector(pexpr!(
            "({b} * (dot({a}, {b}) / dot({b}, {b})))",
            a = a,
            b = atom(&b)
        )),
        Reflect => VecResult::Vector(pexpr!(
            "({a} - 2 * dot(norm({b}), {a}) * norm({b}))",
            a = atom(&a),
            b = b
        )),
        Faceforward => VecResult::Vector(pexpr!(
            "select(dot({}, {}) < 0, {}, -{})",
            c,
            b,
            a,
            atom(&a)
        )),
        DotProduct => VecResult::Value(match (a.as_vector(), b.as_vector()) {
            (Some(x), Some(y)) => Expr::number(dot(x, y)),
            _ => func2("dot", &a, &b),
        }),
        Distance => VecResult::Value(match (a.as_vector(), b.as_vector()) {
            (Some(x), Some(y)) => {
                let d = [x[0] - y[0], x[1] - y[1], x[2] - y[2]];
                Expr::number(dot(d, d).sqrt())
            }
            _ => func2("dist", &a, &b),
        }),
        Length => VecResult::Value(match a.as_vector() {
            Some(x) => Expr::number(dot(x, x).sqrt()),
            None => func1("length", &a),
        }),
        Scale => {
            let s = n.input_any(ctx, &["Scale"])?;
            VecResult::Vector(match (a.as_vector(), s.as_number()) {
                (Some(x), Some(s)) => Expr::vector([x[0] * s, x[1] * s, x[2] * s]),
                _ => infix("*", &a, &s),
            })
        }
        Normalize => VecResult::Vector(match a.as_vector() {
            Some(x) => {
                let l = dot(x, x).sqrt();
                Expr::vector([safe_div(x[0], l), safe_div(x[1], l), safe_div(x[2], l)])
            }
            None => func1("norm", &a),
        }),
        Absolute => VecResult::Vector(vec_unary(&a, f64::abs, |a| func1("abs", a))),
        Minimum => VecResult::Vector(vec_binary(&a, &b, f64::min, |a, b| func2("min", a, b))),
        Maximum => VecResult::Vector(vec_binary(&a, &b, f64::max, |a, b| func2("max", a, b))),
        Floor => VecResult::Vector(vec_unary(&a, f64::floor, |a| func1("floor", a))),
        Ceil => VecResult::Vector(vec_unary(&a, f64::ceil, |a| func1("ceil", a))),
        Fraction => VecResult::Vector(vec_unary(&a, |x| x - x.floor(), |a| func1("fract", a))),
        Modulo => VecResult::Vector(vec_binary(
            &a,
            &b,
            |x, y| if y != 0.0 { x % y } else { 0.0 },
            |a, b| func2("fmod", a, b),
        )),
        Wrap => VecResult::Vector(pexpr!("wrap({}, {}, {})", a, b, c)),
        Snap => VecResult::Vector(vec_binary(&a, &b, snap, |a, b| func2("snap", a, b))),
        Sine => VecResult::Vector(vec_unary(&a, f64::sin, |a| func1("sin", a))),
        Cosine => VecResult::Vector(vec_unary(&a, f64::cos, |a| func1("cos", a))),
        Tangent => VecResult::Vector(vec_unary(&a, f64::tan, |a| func1("tan", a))),
        Refract | Unsupported => return Err(n.unsupported_operation(op)),
    };

    // The output not produced by the operation reads as zero
    Ok(match (result, output) {
        (VecResult::Vector(e), "Vector") | (VecResult::Value(e), "Value") => e,
        (VecResult::Vector(_), _) => Expr::number(0.0),
        (VecResult::Value(_), _) => Expr::vector([0.0; 3]),
    })
}

pub(super) fn clamp(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &ClampNode) -> LowerResult {
    let value = n.input(ctx, "Value")?;
    let lo = n.input(ctx, "Min")?;
    let hi = n.input(ctx, "Max")?;

    Ok(match props.clamp_type {
        ClampType::Minmax => ternary(
            &value,
            &lo,
            &hi,
            |v, lo, hi| v.max(lo).min(hi),
            |v, lo, hi| pexpr!("clamp({}, {}, {})", v, lo, hi),
        ),
        ClampType::Range => ternary(
            &value,
            &lo,
            &hi,
            |v, lo, hi| v.max(lo.min(hi)).min(lo.max(hi)),
            |v, lo, hi| {
                pexpr!(
                    "clamp({v}, min({lo}, {hi}), max({lo}, {hi}))",
                    v = v,
                    lo = lo,
                    hi = hi
                )
            },
        ),
    })
}

/// Scalar map range: `[from_min, from_max] -> [to_min, to_max]`.
pub(super) fn map_range(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &MapRangeNode,
) -> LowerResult {
    let vector = props.data_type == MapRangeDataType::FloatVector;
    let key = |name: &str| {
        if vector {
            format!("{}_FLOAT3", name.replace(' ', "_"))
        } else {
            name.to_string()
        }
    };
    let value = if vector {
        n.input(ctx, "Vector")?
    } else {
        n.input(ctx, "Value")?
    };
    let from_min = n.input(ctx, &key("From Min"))?;
    let from_max = n.input(ctx, &key("From Max"))?;
    let to_min = n.input(ctx, &key("To Min"))?;
    let to_max = n.input(ctx, &key("To Max"))?;
    let steps = if props.interpolation_type == MapRangeInterpolation::Stepped {
        Some(n.input(ctx, &key("Steps"))?)
    } else {
        None
    };

    let literal = |e: &Expr| e.as_number().or_else(|| e.as_vector().map(|v| v[0]));
    if !vector {
        if let (Some(v), Some(fmin), Some(fmax), Some(tmin), Some(tmax)) = (
            literal(&value),
            literal(&from_min),
            literal(&from_max),
            literal(&to_min),
            literal(&to_max),
        ) {
            let steps = steps.as_ref().and_then(literal);
            if steps.is_some() || props.interpolation_type != MapRangeInterpolation::Stepped {
                let folded = map_range_value(props, v, fmin, fmax, tmin, tmax, steps.unwrap_or(4.0));
                return Ok(Expr::number(folded));
            }
        }
    }

    let t = pexpr!(
        "(({} - {}) / ({} - {}))",
        atom(&value),
        atom(&from_min),
        atom(&from_max),
        atom(&from_min)
    );
    let t = match props.interpolation_type {
        MapRangeInterpolation::Linear => t,
        MapRangeInterpolation::Stepped => {
            let steps = steps.unwrap_or_else(|| Expr::number(4.0));
            pexpr!("(floor({} * ({} + 1)) / {})", t, atom(&steps), atom(&steps))
        }
        MapRangeInterpolation::Smoothstep => pexpr!("smoothstep(clamp({}, 0, 1))", t),
        MapRangeInterpolation::Smootherstep => pexpr!("smootherstep(clamp({}, 0, 1))", t),
    };
    let result = pexpr!(
        "({} + {} * ({} - {}))",
        atom(&to_min),
        t,
        atom(&to_max),
        atom(&to_min)
    );

    Ok(if props.clamp {
        pexpr!(
            "clamp({r}, min({lo}, {hi}), max({lo}, {hi}))",
            r = result,
            lo = to_min,
            hi = to_max
        )
    } else {
        result
    })
}

fn map_range_value(
    props: &MapRangeNode,
    v: f64,
    fmin: f64,
    fmax: f64,
    tmin: f64,
    tmax: f64,
    steps: f64,
) -> f64 {
    let t = safe_div(v - fmin, fmax - fmin);
    let t = match props.interpolation_type {
        MapRangeInterpolation::Linear => t,
        MapRangeInterpolation::Stepped => safe_div((t * (steps + 1.0)).floor(), steps),
        MapRangeInterpolation::Smoothstep => {
            let t = t.clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        }
        MapRangeInterpolation::Smootherstep => {
            let t = t.clamp(0.0, 1.0);
            t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
        }
    };
    let r = tmin + t * (tmax - tmin);
    if props.clamp {
        r.max(tmin.min(tmax)).min(tmin.max(tmax))
    } else {
        r
    }
}
