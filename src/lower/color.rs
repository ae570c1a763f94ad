//! Color nodes: mixing, adjustments, ramps, curves and channel access.

use super::coerce::color_to_scalar;
use super::math::saturate;
use super::{atom, pexpr, LowerResult, NodeRef};
use crate::context::ExportContext;
use crate::host::{
    BlendType, ColorMode, ColorModeNode, ColorRampNode, FactorMode, FloatCurveNode, MixDataType,
    MixNode, MixRgbNode, RampElement, RampInterpolation, RgbCurveNode,
};
use crate::types::{fmt_num, Expr};

fn fold_color2(a: &Expr, b: &Expr, f: impl Fn(f64, f64) -> f64) -> Option<Expr> {
    let (a, b) = (a.as_color()?, b.as_color()?);
    Some(Expr::color([
        f(a[0], b[0]),
        f(a[1], b[1]),
        f(a[2], b[2]),
        f(a[3], b[3]),
    ]))
}

/// `mix(a, b, t)` with the trivial factors folded away.
pub(crate) fn lerp(a: &Expr, b: &Expr, t: &Expr) -> Expr {
    match t.as_number() {
        Some(t) if t <= 0.0 => a.clone(),
        Some(t) if t >= 1.0 => b.clone(),
        Some(t) => {
            if let Some(c) = fold_color2(a, b, |x, y| x + (y - x) * t) {
                return c;
            }
            if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
                return Expr::number(x + (y - x) * t);
            }
            pexpr!("mix({}, {}, {})", a, b, t)
        }
        None => pexpr!("mix({}, {}, {})", a, b, t),
    }
}

fn arith(op: &str, a: &Expr, b: &Expr, f: impl Fn(f64, f64) -> f64) -> Expr {
    fold_color2(a, b, f).unwrap_or_else(|| pexpr!("({} {} {})", atom(a), op, atom(b)))
}

/// Blend `b` over `a` with factor `t`.
fn blend(mode: BlendType, t: &Expr, a: &Expr, b: &Expr) -> Option<Expr> {
    let over = |e: Expr| lerp(a, &e, t);
    Some(match mode {
        BlendType::Mix => lerp(a, b, t),
        BlendType::Darken => over(
            fold_color2(a, b, f64::min).unwrap_or_else(|| pexpr!("min({}, {})", a, b)),
        ),
        BlendType::Lighten => over(
            fold_color2(a, b, f64::max).unwrap_or_else(|| pexpr!("max({}, {})", a, b)),
        ),
        BlendType::Multiply => over(arith("*", a, b, |x, y| x * y)),
        BlendType::Add => over(arith("+", a, b, |x, y| x + y)),
        BlendType::Subtract => over(arith("-", a, b, |x, y| x - y)),
        BlendType::Divide => over(arith("/", a, b, |x, y| if y != 0.0 { x / y } else { 0.0 })),
        BlendType::Difference => over(
            fold_color2(a, b, |x, y| (x - y).abs())
                .unwrap_or_else(|| pexpr!("abs({} - {})", atom(a), atom(b))),
        ),
        BlendType::Exclusion => over(
            fold_color2(a, b, |x, y| (x + y - 2.0 * x * y).max(0.0)).unwrap_or_else(|| {
                pexpr!(
                    "max({a} + {b} - 2 * {a} * {b}, color(0))",
                    a = atom(a),
                    b = atom(b)
                )
            }),
        ),
        BlendType::Screen => pexpr!("mix_screen({}, {}, {})", a, b, t),
        BlendType::Overlay => pexpr!("mix_overlay({}, {}, {})", a, b, t),
        BlendType::Dodge => pexpr!("mix_dodge({}, {}, {})", a, b, t),
        BlendType::Burn => pexpr!("mix_burn({}, {}, {})", a, b, t),
        BlendType::SoftLight => pexpr!("mix_soft({}, {}, {})", a, b, t),
        BlendType::LinearLight => pexpr!("mix_linear({}, {}, {})", a, b, t),
        BlendType::Hue => pexpr!("mix_hue({}, {}, {})", a, b, t),
        BlendType::Saturation => pexpr!("mix_saturation({}, {}, {})", a, b, t),
        BlendType::Value => pexpr!("mix_value({}, {}, {})", a, b, t),
        BlendType::Color => pexpr!("mix_color({}, {}, {})", a, b, t),
        BlendType::Unsupported => return None,
    })
}

fn clamp_color(c: Expr) -> Expr {
    match c.as_color() {
        Some(v) => Expr::color([
            v[0].clamp(0.0, 1.0),
            v[1].clamp(0.0, 1.0),
            v[2].clamp(0.0, 1.0),
            v[3].clamp(0.0, 1.0),
        ]),
        None => pexpr!("clamp({}, color(0), color(1))", c),
    }
}

pub(super) fn mix_rgb(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &MixRgbNode) -> LowerResult {
    let t = saturate(n.input(ctx, "Fac")?);
    let a = n.input(ctx, "Color1")?;
    let b = n.input(ctx, "Color2")?;
    let c = blend(props.blend_type, &t, &a, &b).ok_or_else(|| n.unsupported_operation(props.blend_type))?;
    Ok(if props.use_clamp { clamp_color(c) } else { c })
}

pub(super) fn mix(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &MixNode) -> LowerResult {
    let factor = |t: Expr| if props.clamp_factor { saturate(t) } else { t };
    match props.data_type {
        MixDataType::Float => {
            let t = factor(n.input(ctx, "Factor_Float")?);
            let a = n.input(ctx, "A_Float")?;
            let b = n.input(ctx, "B_Float")?;
            Ok(lerp(&a, &b, &t))
        }
        MixDataType::Vector => {
            let a = n.input(ctx, "A_Vector")?;
            let b = n.input(ctx, "B_Vector")?;
            if props.factor_mode == FactorMode::NonUniform {
                let t = n.input(ctx, "Factor_Vector")?;
                let t = if props.clamp_factor {
                    pexpr!("clamp({}, vec3(0), vec3(1))", t)
                } else {
                    t
                };
                Ok(pexpr!("({a} + ({b} - {a}) * {t})", a = atom(&a), b = atom(&b), t = atom(&t)))
            } else {
                let t = factor(n.input(ctx, "Factor_Float")?);
                Ok(lerp(&a, &b, &t))
            }
        }
        MixDataType::Rgba => {
            let t = factor(n.input(ctx, "Factor_Float")?);
            let a = n.input(ctx, "A_Color")?;
            let b = n.input(ctx, "B_Color")?;
            let c = blend(props.blend_type, &t, &a, &b)
                .ok_or_else(|| n.unsupported_operation(props.blend_type))?;
            Ok(if props.clamp_result { clamp_color(c) } else { c })
        }
        MixDataType::Unsupported => Err(n.unsupported_operation(props.data_type)),
    }
}

pub(super) fn invert(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let t = n.input(ctx, "Fac")?;
    let c = n.input(ctx, "Color")?;
    let inverted = match c.as_color() {
        Some(v) => Expr::color([1.0 - v[0], 1.0 - v[1], 1.0 - v[2], v[3]]),
        None => {
            let c = atom(&c);
            pexpr!("color(1 - {c}.r, 1 - {c}.g, 1 - {c}.b, {c}.a)", c = c)
        }
    };
    Ok(lerp(&c, &inverted, &t))
}

pub(super) fn gamma(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let c = n.input(ctx, "Color")?;
    let g = n.input(ctx, "Gamma")?;
    if let (Some(v), Some(g)) = (c.as_color(), g.as_number()) {
        let p = |x: f64| if x > 0.0 { x.powf(g) } else { x };
        return Ok(Expr::color([p(v[0]), p(v[1]), p(v[2]), v[3]]));
    }
    if g.as_number() == Some(1.0) {
        return Ok(c);
    }
    Ok(pexpr!("pow({}, color({}))", c, g))
}

pub(super) fn bright_contrast(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let c = n.input(ctx, "Color")?;
    let bright = n.input(ctx, "Bright")?;
    let contrast = n.input(ctx, "Contrast")?;

    let gain = match contrast.as_number() {
        Some(k) => Expr::number(1.0 + k),
        None => pexpr!("(1 + {})", contrast),
    };
    let offset = match (bright.as_number(), contrast.as_number()) {
        (Some(b), Some(k)) => Expr::number(b - k * 0.5),
        _ => pexpr!("({} - {} * 0.5)", atom(&bright), atom(&contrast)),
    };
    if let (Some(v), Some(g), Some(o)) = (c.as_color(), gain.as_number(), offset.as_number()) {
        let f = |x: f64| (g * x + o).max(0.0);
        return Ok(Expr::color([f(v[0]), f(v[1]), f(v[2]), v[3]]));
    }
    Ok(pexpr!(
        "max({} * {} + color({}), color(0))",
        atom(&gain),
        atom(&c),
        offset
    ))
}

pub(super) fn hue_saturation(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let hue = n.input(ctx, "Hue")?;
    let sat = n.input(ctx, "Saturation")?;
    let val = n.input(ctx, "Value")?;
    let t = n.input(ctx, "Fac")?;
    let c = n.input(ctx, "Color")?;

    let identity = hue.as_number() == Some(0.5)
        && sat.as_number() == Some(1.0)
        && val.as_number() == Some(1.0);
    if identity {
        return Ok(c);
    }

    let hsv = pexpr!("rgbtohsv({})", c);
    let adjusted = pexpr!(
        "hsvtorgb(color(fract({h}.r + {hue} + 0.5), clamp({h}.g * {sat}, 0, 1), {h}.b * {val}, {c}.a))",
        h = hsv,
        hue = atom(&hue),
        sat = atom(&sat),
        val = atom(&val),
        c = atom(&c)
    );
    Ok(lerp(&c, &adjusted, &t))
}

pub(super) fn blackbody(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let temperature = n.input(ctx, "Temperature")?;
    Ok(pexpr!("blackbody({})", temperature))
}

// Color ramp

fn sorted_elements(props: &ColorRampNode) -> Vec<RampElement> {
    let mut elements = props.elements.clone();
    elements.sort_by(|a, b| a.position.total_cmp(&b.position));
    elements
}

/// Evaluate the ramp at a constant position.
fn eval_ramp(elements: &[RampElement], interp: RampInterpolation, t: f64) -> [f64; 4] {
    let Some(first) = elements.first() else {
        return [0.0; 4];
    };
    let mut acc = first.color;
    for pair in elements.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if interp == RampInterpolation::Constant {
            if t >= hi.position {
                acc = hi.color;
            }
            continue;
        }
        let span = hi.position - lo.position;
        let mut w = if span > 0.0 {
            ((t - lo.position) / span).clamp(0.0, 1.0)
        } else if t < hi.position {
            0.0
        } else {
            1.0
        };
        if interp == RampInterpolation::Ease {
            w = w * w * (3.0 - 2.0 * w);
        }
        for (k, channel) in acc.iter_mut().enumerate() {
            *channel += (hi.color[k] - *channel) * w;
        }
    }
    acc
}

/// Textual ramp over a channel: `value(i)` gives the literal of element `i`.
fn ramp_expr(
    elements: &[RampElement],
    interp: RampInterpolation,
    t: &Expr,
    value: impl Fn(&RampElement) -> Expr,
) -> Expr {
    let t_atom = atom(t);
    let Some(first) = elements.first() else {
        return value(&RampElement {
            position: 0.0,
            color: [0.0; 4],
        });
    };
    let mut acc = value(first);
    for pair in elements.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        let next = value(hi);
        if interp == RampInterpolation::Constant {
            acc = pexpr!("select({} < {}, {}, {})", t_atom, fmt_num(hi.position), acc, next);
            continue;
        }
        let span = hi.position - lo.position;
        let w = if span > 0.0 {
            pexpr!(
                "clamp(({} - {}) / {}, 0, 1)",
                t_atom,
                fmt_num(lo.position),
                fmt_num(span)
            )
        } else {
            pexpr!("select({} < {}, 0, 1)", t_atom, fmt_num(hi.position))
        };
        let w = if interp == RampInterpolation::Ease {
            pexpr!("smoothstep({})", w)
        } else {
            w
        };
        acc = pexpr!("mix({}, {}, {})", acc, next, w);
    }
    acc
}

pub(super) fn color_ramp(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &ColorRampNode,
    output: &str,
) -> LowerResult {
    let t = n.input(ctx, "Fac")?;
    let elements = sorted_elements(props);
    // B-spline and cardinal ramps are approximated piecewise linearly
    let interp = match props.interpolation {
        RampInterpolation::BSpline | RampInterpolation::Cardinal => RampInterpolation::Linear,
        other => other,
    };
    let alpha = output == "Alpha";

    if let Some(t) = t.as_number() {
        let c = eval_ramp(&elements, interp, t);
        return Ok(if alpha {
            Expr::number(c[3])
        } else {
            Expr::color(c)
        });
    }

    Ok(if alpha {
        ramp_expr(&elements, interp, &t, |e| Expr::number(e.color[3]))
    } else {
        ramp_expr(&elements, interp, &t, |e| Expr::color(e.color))
    })
}

// Curves

fn is_identity_curve(points: &[[f64; 2]]) -> bool {
    points.is_empty() || points.iter().all(|p| p[0] == p[1])
}

fn eval_curve(points: &[[f64; 2]], x: f64) -> f64 {
    let Some(first) = points.first() else {
        return x;
    };
    let mut acc = first[1];
    for pair in points.windows(2) {
        let span = pair[1][0] - pair[0][0];
        let w = if span > 0.0 {
            ((x - pair[0][0]) / span).clamp(0.0, 1.0)
        } else if x < pair[1][0] {
            0.0
        } else {
            1.0
        };
        acc += (pair[1][1] - acc) * w;
    }
    acc
}

/// Piecewise linear lookup of `x` through the curve points.
fn curve_expr(points: &[[f64; 2]], x: &Expr) -> Expr {
    if is_identity_curve(points) {
        return x.clone();
    }
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]));
    if let Some(v) = x.as_number() {
        return Expr::number(eval_curve(&sorted, v));
    }

    let x_atom = atom(x);
    let mut acc = Expr::number(sorted[0][1]);
    for pair in sorted.windows(2) {
        let span = pair[1][0] - pair[0][0];
        let w = if span > 0.0 {
            pexpr!(
                "clamp(({} - {}) / {}, 0, 1)",
                x_atom,
                fmt_num(pair[0][0]),
                fmt_num(span)
            )
        } else {
            pexpr!("select({} < {}, 0, 1)", x_atom, fmt_num(pair[1][0]))
        };
        acc = pexpr!("mix({}, {}, {})", acc, fmt_num(pair[1][1]), w);
    }
    acc
}

pub(super) fn float_curve(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &FloatCurveNode,
) -> LowerResult {
    let t = n.input(ctx, "Factor")?;
    let value = n.input(ctx, "Value")?;
    let mapped = curve_expr(&props.points, &value);
    Ok(lerp(&value, &mapped, &t))
}

pub(super) fn rgb_curve(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &RgbCurveNode,
) -> LowerResult {
    let t = n.input(ctx, "Fac")?;
    let c = n.input(ctx, "Color")?;

    let empty: Vec<[f64; 2]> = Vec::new();
    let curve = |i: usize| props.curves.get(i).unwrap_or(&empty);
    if props.curves.iter().all(|c| is_identity_curve(c)) {
        return Ok(c);
    }

    let channel = |k: usize, name: &str| -> Expr {
        let x = match c.as_color() {
            Some(v) => Expr::number(v[k]),
            None => pexpr!("{}.{}", atom(&c), name),
        };
        // Combined curve first, then the per-channel one
        curve_expr(curve(k + 1), &curve_expr(curve(0), &x))
    };
    let r = channel(0, "r");
    let g = channel(1, "g");
    let b = channel(2, "b");
    let a = match c.as_color() {
        Some(v) => Expr::number(v[3]),
        None => pexpr!("{}.a", atom(&c)),
    };

    let mapped = match (r.as_number(), g.as_number(), b.as_number(), a.as_number()) {
        (Some(r), Some(g), Some(b), Some(a)) => Expr::color([r, g, b, a]),
        _ => pexpr!("color({}, {}, {}, {})", r, g, b, a),
    };
    Ok(lerp(&c, &mapped, &t))
}

pub(super) fn rgb_to_bw(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let c = n.input(ctx, "Color")?;
    Ok(color_to_scalar(&c))
}

// Channels

fn channel_index(output: &str) -> Option<usize> {
    match output {
        "Red" | "R" | "Hue" | "H" | "X" => Some(0),
        "Green" | "G" | "Saturation" | "S" | "Y" => Some(1),
        "Blue" | "B" | "Value" | "V" | "Lightness" | "L" | "Z" => Some(2),
        "Alpha" | "A" => Some(3),
        _ => None,
    }
}

const SWIZZLE: [&str; 4] = ["r", "g", "b", "a"];

pub(super) fn separate_color(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &ColorModeNode,
    output: &str,
) -> LowerResult {
    let k = channel_index(output).ok_or_else(|| n.missing_socket(output))?;
    let c = n.input_at(ctx, 0)?;

    let source = match props.mode {
        ColorMode::Rgb => {
            if let Some(v) = c.as_color() {
                return Ok(Expr::number(v[k]));
            }
            c
        }
        ColorMode::Hsv => pexpr!("rgbtohsv({})", c),
        ColorMode::Hsl => pexpr!("rgbtohsl({})", c),
    };
    Ok(pexpr!("{}.{}", atom(&source), SWIZZLE[k]))
}

pub(super) fn combine_color(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &ColorModeNode,
) -> LowerResult {
    let x = n.input_at(ctx, 0)?;
    let y = n.input_at(ctx, 1)?;
    let z = n.input_at(ctx, 2)?;

    let packed = match (x.as_number(), y.as_number(), z.as_number()) {
        (Some(x), Some(y), Some(z)) if props.mode == ColorMode::Rgb => {
            return Ok(Expr::color([x, y, z, 1.0]))
        }
        _ => pexpr!("color({}, {}, {}, 1)", x, y, z),
    };
    Ok(match props.mode {
        ColorMode::Rgb => packed,
        ColorMode::Hsv => pexpr!("hsvtorgb({})", packed),
        ColorMode::Hsl => pexpr!("hsltorgb({})", packed),
    })
}

pub(super) fn separate_xyz(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    output: &str,
) -> LowerResult {
    let k = match output {
        "X" => 0,
        "Y" => 1,
        "Z" => 2,
        other => return Err(n.missing_socket(other)),
    };
    let v = n.input(ctx, "Vector")?;
    Ok(match v.as_vector() {
        Some(v) => Expr::number(v[k]),
        None => pexpr!("{}.{}", atom(&v), ["x", "y", "z"][k]),
    })
}

pub(super) fn combine_xyz(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    let x = n.input(ctx, "X")?;
    let y = n.input(ctx, "Y")?;
    let z = n.input(ctx, "Z")?;
    Ok(match (x.as_number(), y.as_number(), z.as_number()) {
        (Some(x), Some(y), Some(z)) => Expr::vector([x, y, z]),
        _ => pexpr!("vec3({}, {}, {})", x, y, z),
    })
}
