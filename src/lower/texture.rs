//! Texture nodes.
//!
//! Image textures become `name(uv)` lookups of registered `image` textures;
//! procedural textures map onto the renderer's built-in noise and pattern
//! functions.

use super::coerce::scalar_to_color;
use super::{atom, pexpr, LowerError, LowerResult, NodeRef};
use crate::context::ExportContext;
use crate::export::texture::register_image;
use crate::host::{
    Dimensions, GradientTextureNode, GradientType, ImageExtension, ImageInterpolation, ImageProjection,
    ImageTextureNode, NoiseTextureNode, VoronoiTextureNode, WaveDirection, WaveProfile,
    WaveTextureNode, WaveType,
};
use crate::types::{fmt_num, Expr};

/// The `Vector` input if linked, otherwise the current texture coordinate.
fn coordinate(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>) -> LowerResult {
    if n.is_linked(ctx, "Vector") {
        n.input(ctx, "Vector")
    } else {
        Ok(ctx.texcoord())
    }
}

fn wrap_mode(extension: ImageExtension) -> &'static str {
    match extension {
        ImageExtension::Repeat => "repeat",
        ImageExtension::Mirror => "mirror",
        // Clip has no renderer counterpart
        ImageExtension::Extend | ImageExtension::Clip => "clamp",
    }
}

fn filter_type(interpolation: ImageInterpolation) -> &'static str {
    match interpolation {
        ImageInterpolation::Closest => "nearest",
        _ => "bilinear",
    }
}

fn texture_name(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, props: &ImageTextureNode) -> Result<String, LowerError> {
    let missing = || LowerError::MissingProperty {
        node: n.node.name.clone(),
        property: "image".to_string(),
    };
    let scene = ctx.scene;
    let image_name = props.image.as_deref().ok_or_else(missing)?;
    let image = scene.image(image_name).ok_or_else(missing)?;
    Ok(register_image(
        ctx,
        image,
        wrap_mode(props.extension),
        filter_type(props.interpolation),
    ))
}

fn sample(name: &str, uv: Expr, output: &str) -> LowerResult {
    let lookup = pexpr!("{}({})", name, uv);
    Ok(match output {
        "Alpha" => pexpr!("{}.a", lookup),
        _ => lookup,
    })
}

pub(super) fn image(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &ImageTextureNode,
    output: &str,
) -> LowerResult {
    if props.projection != ImageProjection::Flat {
        ctx.report_warning(format!(
            "Projection {:?} of image texture '{}' is exported as flat",
            props.projection,
            n.name()
        ));
    }
    let name = texture_name(ctx, n, props)?;
    let coord = coordinate(ctx, n)?;
    sample(&name, pexpr!("{}.xy", atom(&coord)), output)
}

pub(super) fn environment(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &ImageTextureNode,
    output: &str,
) -> LowerResult {
    let name = texture_name(ctx, n, props)?;
    if !n.is_linked(ctx, "Vector") {
        // The environment light provides equirectangular coordinates itself
        return sample(&name, Expr::new("uv"), output);
    }
    let d = atom(&n.input(ctx, "Vector")?);
    let uv = pexpr!(
        "vec2(atan2({d}.y, {d}.x) / (2 * Pi) + 0.5, acos(clamp(norm({d}).z, -1, 1)) / Pi)",
        d = d
    );
    sample(&name, uv, output)
}

pub(super) fn checker(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: &str) -> LowerResult {
    let coord = coordinate(ctx, n)?;
    let scale = n.input(ctx, "Scale")?;
    let test = pexpr!("checkerboard({} * {}) == 1", atom(&coord), atom(&scale));
    match output {
        "Fac" => Ok(pexpr!("select({}, 1, 0)", test)),
        _ => {
            let c1 = n.input(ctx, "Color1")?;
            let c2 = n.input(ctx, "Color2")?;
            Ok(pexpr!("select({}, {}, {})", test, c1, c2))
        }
    }
}

/// Noise and voronoi are evaluated on the XY plane of the coordinate.
pub(super) fn noise(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &NoiseTextureNode,
    output: &str,
) -> LowerResult {
    if matches!(props.noise_dimensions, Dimensions::Three | Dimensions::Four) {
        log::debug!("Noise texture '{}' evaluated in 2D", n.name());
    }
    let coord = coordinate(ctx, n)?;
    let scale = n.input(ctx, "Scale")?;
    let detail = n.input_or(ctx, "Detail", Expr::number(2.0));
    let roughness = n.input_or(ctx, "Roughness", Expr::number(0.5));
    let lacunarity = n.input_or(ctx, "Lacunarity", Expr::number(2.0));

    let octaves = detail.try_extract(2.0).clamp(0.0, 15.0).floor() as i64 + 1;
    let func = if output == "Color" { "cfbm" } else { "fbm" };
    Ok(pexpr!(
        "{}({}.xy, {}, {}, {}, {})",
        func,
        atom(&coord),
        scale,
        octaves,
        lacunarity,
        roughness
    ))
}

pub(super) fn voronoi(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    _props: &VoronoiTextureNode,
    output: &str,
) -> LowerResult {
    let func = match output {
        "Distance" => "voronoi",
        "Color" => "cvoronoi",
        other => return Err(n.unsupported_operation(format!("{} output", other))),
    };
    let coord = coordinate(ctx, n)?;
    let scale = n.input(ctx, "Scale")?;
    Ok(pexpr!("{}({}.xy, {})", func, atom(&coord), scale))
}

pub(super) fn wave(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &WaveTextureNode,
    output: &str,
) -> LowerResult {
    let coord = coordinate(ctx, n)?;
    let scale = n.input(ctx, "Scale")?;
    let phase = n.input_or(ctx, "Phase Offset", Expr::number(0.0));
    let p = atom(&pexpr!("({} * {})", atom(&coord), atom(&scale)));

    let base = match props.wave_type {
        WaveType::Bands => match props.bands_direction {
            WaveDirection::X => format!("{}.x * 20", p),
            WaveDirection::Y => format!("{}.y * 20", p),
            WaveDirection::Z => format!("{}.z * 20", p),
            _ => format!("({p}.x + {p}.y + {p}.z) * 10", p = p),
        },
        WaveType::Rings => match props.rings_direction {
            WaveDirection::X => format!("length(vec2({p}.y, {p}.z)) * 20", p = p),
            WaveDirection::Y => format!("length(vec2({p}.x, {p}.z)) * 20", p = p),
            WaveDirection::Z => format!("length(vec2({p}.x, {p}.y)) * 20", p = p),
            _ => format!("length({}) * 20", p),
        },
    };
    let phase_term = match phase.as_number() {
        Some(v) if v == 0.0 => String::new(),
        _ => format!(" + {}", atom(&phase)),
    };
    let arg = format!("({}{})", base, phase_term);

    let value = match props.wave_profile {
        WaveProfile::Sin => pexpr!("(0.5 + 0.5 * sin({} - Pi / 2))", arg),
        WaveProfile::Saw => pexpr!("fract({} / (2 * Pi))", arg),
        WaveProfile::Tri => pexpr!(
            "(abs({x} - floor({x} + 0.5)) * 2)",
            x = format!("({} / (2 * Pi))", arg)
        ),
    };
    Ok(if output == "Color" {
        scalar_to_color(&value)
    } else {
        value
    })
}

pub(super) fn gradient(
    ctx: &mut ExportContext<'_>,
    n: &NodeRef<'_>,
    props: &GradientTextureNode,
    output: &str,
) -> LowerResult {
    let p = atom(&coordinate(ctx, n)?);
    let value = match props.gradient_type {
        GradientType::Linear => pexpr!("{}.x", p),
        GradientType::Quadratic => pexpr!("pow(max({}.x, 0), 2)", p),
        GradientType::Easing => pexpr!("smoothstep(clamp({}.x, 0, 1))", p),
        GradientType::Diagonal => pexpr!("(({p}.x + {p}.y) * 0.5)", p = p),
        GradientType::Radial => pexpr!("(atan2({p}.y, {p}.x) / (2 * Pi) + 0.5)", p = p),
        GradientType::QuadraticSphere => pexpr!("pow(max(0.999999 - length({}), 0), 2)", p),
        GradientType::Spherical => pexpr!("max(0.999999 - length({}), 0)", p),
    };
    let value = pexpr!("clamp({}, 0, 1)", value);
    Ok(if output == "Color" {
        scalar_to_color(&value)
    } else {
        value
    })
}

const HASH_SEEDS: [[f64; 3]; 3] = [
    [12.9898, 78.233, 37.719],
    [39.3468, 11.1351, 83.155],
    [73.156, 52.235, 9.151],
];

pub(super) fn white_noise(ctx: &mut ExportContext<'_>, n: &NodeRef<'_>, output: &str) -> LowerResult {
    let p = coordinate(ctx, n)?;
    let hash = |seed: [f64; 3]| {
        format!(
            "hash(dot({}, vec3({}, {}, {})))",
            p,
            fmt_num(seed[0]),
            fmt_num(seed[1]),
            fmt_num(seed[2])
        )
    };
    Ok(match output {
        "Color" => pexpr!(
            "color({}, {}, {}, 1)",
            hash(HASH_SEEDS[0]),
            hash(HASH_SEEDS[1]),
            hash(HASH_SEEDS[2])
        ),
        _ => Expr::new(hash(HASH_SEEDS[0])),
    })
}
