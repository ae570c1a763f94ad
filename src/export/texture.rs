//! Image texture payloads.
//!
//! Every distinct `(image, wrap mode, filter, colorspace)` combination becomes
//! one `image` texture entry. The image itself is copied into the texture
//! directory, or encoded to PNG when the host only supplies pixels.

use crate::context::{ExportContext, TextureKey};
use crate::error::{ExportError, Result};
use crate::host::HostImage;
use crate::output::Texture;
use image::ImageEncoder;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Replace everything that is not valid in an expression identifier.
pub fn escape_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Where the pixels of an image come from.
enum Payload<'i> {
    File(PathBuf),
    Pixels(&'i [f32]),
    Missing(String),
}

fn payload_source<'i>(base_dir: Option<&Path>, image: &'i HostImage) -> Payload<'i> {
    if let Some(path) = image.filepath.as_deref() {
        // Blender marks paths relative to the blend file with a leading '//'
        let path = Path::new(path.trim_start_matches("//"));
        let resolved = match base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        if resolved.is_file() {
            return Payload::File(resolved);
        }
        if image.pixels.is_none() {
            return Payload::Missing(format!(
                "image file '{}' of image '{}' does not exist",
                resolved.display(),
                image.name
            ));
        }
    }

    match image.pixels.as_deref() {
        Some(pixels) => {
            let expected = image.width as usize * image.height as usize * image.channels as usize;
            if expected == 0 || pixels.len() < expected {
                Payload::Missing(format!(
                    "image '{}' has {} pixel values, expected {}",
                    image.name,
                    pixels.len(),
                    expected
                ))
            } else {
                Payload::Pixels(pixels)
            }
        }
        None => Payload::Missing(format!("image '{}' has no file and no pixels", image.name)),
    }
}

/// File name of the image inside the texture directory.
pub fn payload_file_name(image: &HostImage) -> String {
    image
        .filepath
        .as_deref()
        .and_then(|p| Path::new(p.trim_start_matches("//")).file_name())
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.png", escape_identifier(&image.name)))
}

/// Encode float pixels (bottom-up rows, 1 to 4 channels) as an RGBA8 PNG.
pub fn write_png(image: &HostImage, pixels: &[f32], dest: &Path) -> Result<()> {
    let (width, height) = (image.width as usize, image.height as usize);
    let channels = image.channels.clamp(1, 4) as usize;
    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for row in (0..height).rev() {
        for col in 0..width {
            let px = &pixels[(row * width + col) * channels..][..channels];
            let [r, g, b, a] = match channels {
                1 => [px[0], px[0], px[0], 1.0],
                2 => [px[0], px[0], px[0], px[1]],
                3 => [px[0], px[1], px[2], 1.0],
                _ => [px[0], px[1], px[2], px[3]],
            };
            rgba.extend([to_byte(r), to_byte(g), to_byte(b), to_byte(a)]);
        }
    }

    let file = fs::File::create(dest)?;
    let encoder = image::codecs::png::PngEncoder::new(BufWriter::new(file));
    encoder.write_image(
        &rgba,
        image.width,
        image.height,
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Name of the texture entry for `image`, created (and written) on first use.
pub fn register_image(
    ctx: &mut ExportContext<'_>,
    image: &HostImage,
    wrap_mode: &'static str,
    filter_type: &'static str,
) -> String {
    let key = TextureKey {
        path: image
            .filepath
            .clone()
            .unwrap_or_else(|| format!("<{}>", image.name)),
        wrap_mode,
        filter_type,
        linear: image.is_linear(),
    };
    if let Some(name) = ctx.texture_name(&key) {
        return name.to_string();
    }

    let base = format!("_tex_{}", escape_identifier(&image.name));
    let mut name = base.clone();
    let mut suffix = 1;
    while ctx.texture_name_taken(&name) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }

    let (file_name, fresh) = ctx.texture_file(&key.path, &payload_file_name(image));
    if let (true, Some(dir)) = (fresh, ctx.tex_dir()) {
        let dest = dir.join(&file_name);
        match payload_source(ctx.scene.base_dir(), image) {
            Payload::Missing(reason) => ctx.report_warning(reason),
            source => {
                if let Payload::Pixels(pixels) = &source {
                    if pixels.iter().any(|v| *v > 1.0) {
                        ctx.report_warning(format!(
                            "Image '{}' has values above 1 that are clamped in the 8-bit PNG",
                            image.name
                        ));
                    }
                }
                if let Err(err) = write_payload(&source, image, &dest) {
                    ctx.record_io_error(err);
                }
            }
        }
    }

    log::debug!("Registered texture '{}' for image '{}'", name, image.name);
    ctx.output.textures.push(Texture {
        kind: "image".to_string(),
        name: name.clone(),
        filename: format!("{}/{}", ctx.settings.tex_dir_name, file_name),
        wrap_mode: wrap_mode.to_string(),
        filter_type: filter_type.to_string(),
        linear: key.linear,
    });
    ctx.register_texture(key, name.clone());
    name
}

fn write_payload(source: &Payload<'_>, image: &HostImage, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match source {
        Payload::File(src) => {
            fs::copy(src, dest)?;
            Ok(())
        }
        Payload::Pixels(pixels) => write_png(image, pixels, dest),
        Payload::Missing(reason) => Err(ExportError::Export(reason.clone())),
    }
}
