//! Ignis Exporter CLI
//!
//! Export Blender scene dumps to Ignis scene files.

use clap::{Parser, Subcommand, ValueEnum};
use ignis_exporter::host::NodeKind;
use ignis_exporter::{export_to_file, load_scene, ExportSettings, TechniqueKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ignis-exporter")]
#[command(author, version, about = "Export Blender scene dumps to the Ignis scene format", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene dump to an Ignis JSON scene
    Export {
        /// Scene dump written by the Blender side
        #[arg(short, long)]
        input: PathBuf,

        /// Output scene file; meshes and textures are written next to it
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with export settings
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Only export selected objects
        #[arg(long)]
        selection: bool,

        /// Use a plain diffuse bsdf instead of the scene materials
        #[arg(long)]
        no_materials: bool,

        /// Skip lights and emissive entities
        #[arg(long)]
        no_lights: bool,

        /// Skip camera and film
        #[arg(long)]
        no_camera: bool,

        /// Skip the world background
        #[arg(long)]
        no_background: bool,

        /// Rendering technique
        #[arg(long, value_enum)]
        technique: Option<Technique>,

        /// Maximum ray depth
        #[arg(long)]
        max_depth: Option<u32>,

        /// Fail if the export reported any warning
        #[arg(long)]
        strict: bool,
    },

    /// Show information about a scene dump
    Info {
        /// Scene dump written by the Blender side
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Technique {
    /// Path tracing
    Path,
    /// Volumetric path tracing
    Volpath,
    /// Progressive photon mapping
    Ppm,
    /// Ambient occlusion
    Ao,
}

impl From<Technique> for TechniqueKind {
    fn from(t: Technique) -> Self {
        match t {
            Technique::Path => TechniqueKind::Path,
            Technique::Volpath => TechniqueKind::Volpath,
            Technique::Ppm => TechniqueKind::Ppm,
            Technique::Ao => TechniqueKind::Ao,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            settings,
            selection,
            no_materials,
            no_lights,
            no_camera,
            no_background,
            technique,
            max_depth,
            strict,
        } => {
            let mut settings = match settings {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => ExportSettings::default(),
            };
            if selection {
                settings = settings.with_selection(true);
            }
            if no_materials {
                settings = settings.with_materials(false);
            }
            if no_lights {
                settings = settings.with_lights(false);
            }
            if no_camera {
                settings = settings.with_camera(false);
            }
            if no_background {
                settings = settings.with_background(false);
            }
            if let Some(technique) = technique {
                settings.technique.kind = technique.into();
            }
            if let Some(depth) = max_depth {
                settings.technique.max_depth = depth;
            }
            export_scene(&input, &output, &settings, strict)?;
        }
        Commands::Info { input } => {
            show_scene_info(&input)?;
        }
    }

    Ok(())
}

fn export_scene(
    input: &PathBuf,
    output: &PathBuf,
    settings: &ExportSettings,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene dump from {:?}...", input);
    let scene = load_scene(input)?;

    let report = export_to_file(&scene, settings, output)?;
    println!(
        "Exported {} shapes, {} entities, {} lights, {} bsdfs to {:?}",
        report.scene.shapes.len(),
        report.scene.entities.len(),
        report.scene.lights.len(),
        report.scene.bsdfs.len(),
        output
    );

    let warnings = report.diagnostics.warning_count();
    if warnings > 0 {
        println!("  {} warning(s)", warnings);
        if strict {
            return Err(format!("export reported {} warning(s)", warnings).into());
        }
    }
    Ok(())
}

fn show_scene_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene dump from {:?}...", input);
    let scene = load_scene(input)?;

    println!("\nScene '{}':", scene.name);
    println!("  Objects: {}", scene.objects.len());
    println!("  Instances: {}", scene.resolved_instances().len());
    println!("  Meshes: {}", scene.meshes.len());
    println!("  Lights: {}", scene.lights.len());
    println!("  Materials: {}", scene.materials.len());
    println!("  Node trees: {}", scene.node_trees.len());
    println!("  Images: {}", scene.images.len());

    let mut unsupported: BTreeMap<&str, usize> = BTreeMap::new();
    for tree in &scene.node_trees {
        for (_, node) in tree.nodes() {
            if let NodeKind::Unsupported(idname) = &node.kind {
                *unsupported.entry(idname.as_str()).or_default() += 1;
            }
        }
    }
    if !unsupported.is_empty() {
        println!("\nUnsupported nodes (exported as defaults):");
        for (idname, count) in unsupported {
            println!("  {} x{}", idname, count);
        }
    }
    Ok(())
}
