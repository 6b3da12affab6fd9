//! sceneport CLI
//!
//! Command-line interface for exporting scene descriptions to glTF 2.0.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use sceneport_core::BoundingBox;
use sceneport_export::logging::{init_with_config, TracingConfig};
use sceneport_export::{Axis, FileTextureProvider, GltfExportOptions, GltfExporter, MeshExportSettings};
use sceneport_scene::Scene;

/// sceneport - scene graph to glTF exporter
#[derive(Parser)]
#[command(name = "sceneport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene description to .glb or .gltf
    Export(ExportArgs),

    /// Show a summary of a scene description
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Scene description (JSON)
    input: PathBuf,

    /// Output path; `.glb` or `.gltf` picks the container
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Axis mirrored to change handedness: none, x, z
    #[arg(long, default_value = "z")]
    axis: Axis,

    /// Write morph target deltas as sparse accessors
    #[arg(long)]
    sparse: bool,

    /// Export only position deltas for morph targets
    #[arg(long)]
    position_only: bool,

    /// Give every primitive its own vertex streams
    #[arg(long)]
    divide: bool,

    /// Skip animation clips
    #[arg(long)]
    no_animation: bool,

    /// Write compact JSON for .gltf output
    #[arg(long)]
    compact: bool,

    /// Base directory for texture paths (defaults to the scene's directory)
    #[arg(long)]
    textures: Option<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    /// Scene description (JSON)
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_config(TracingConfig::from_verbosity(cli.verbose));

    match cli.command {
        Commands::Export(args) => cmd_export(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn load_scene(path: &Path) -> Result<Scene> {
    if !path.exists() {
        bail!("File not found: {:?}", path);
    }
    Scene::load(path).with_context(|| format!("Failed to load scene {:?}", path))
}

fn cmd_export(args: ExportArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.input)?;
    info!("Loaded scene: {:?}", args.input);

    let base_dir = args
        .textures
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let provider = FileTextureProvider::with_base_dir(base_dir);

    let options = GltfExportOptions {
        axis: args.axis,
        mesh: MeshExportSettings {
            export_only_blend_shape_position: args.position_only,
            use_sparse_accessor_for_morph_target: args.sparse,
            divide_vertex_buffer: args.divide,
        },
        export_animation: !args.no_animation,
        pretty_json: !args.compact,
        ..Default::default()
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("glb"));

    let mut exporter = GltfExporter::new(options);
    let written = exporter
        .export_to_path(&scene, &provider, &output)
        .with_context(|| format!("Failed to export {:?}", args.input))?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "input": args.input,
                "output": written,
                "nodes": exporter.nodes().len(),
                "meshes": exporter.meshes().len(),
                "materials": exporter.materials().len(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Exported {:?} -> {:?}", args.input, written);
            println!("  Nodes:     {}", exporter.nodes().len());
            println!("  Meshes:    {}", exporter.meshes().len());
            println!("  Materials: {}", exporter.materials().len());
        }
    }

    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.path)?;
    let valid = scene.validate();

    let skinned = scene.renderers.iter().filter(|r| r.is_skinned()).count();
    let vertices: usize = scene.meshes.iter().map(|m| m.vertex_count()).sum();
    let triangles: usize = scene.meshes.iter().map(|m| m.triangle_count()).sum();
    let root = scene.node(scene.root).map(|n| n.name.clone()).unwrap_or_default();
    let corners: Vec<_> = scene
        .meshes
        .iter()
        .filter_map(|m| m.bounding_box())
        .flat_map(|b| [b.min, b.max])
        .collect();
    let bounds = BoundingBox::from_points(&corners);

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": args.path,
                "root": root,
                "nodes": scene.nodes.len(),
                "renderers": scene.renderers.len(),
                "skinned_renderers": skinned,
                "meshes": scene.meshes.len(),
                "vertices": vertices,
                "triangles": triangles,
                "materials": scene.materials.len(),
                "textures": scene.textures.len(),
                "clips": scene.clips.len(),
                "bounds": bounds,
                "valid": valid.is_ok(),
                "error": valid.as_ref().err().map(ToString::to_string),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Scene: {:?}", args.path);
            println!("  Root:       {}", root);
            println!("  Nodes:      {}", scene.nodes.len());
            println!("  Renderers:  {} ({} skinned)", scene.renderers.len(), skinned);
            println!("  Meshes:     {} ({} vertices, {} triangles)", scene.meshes.len(), vertices, triangles);
            println!("  Materials:  {}", scene.materials.len());
            println!("  Textures:   {}", scene.textures.len());
            println!("  Clips:      {}", scene.clips.len());
            if let Some(bounds) = bounds {
                let size = bounds.size();
                println!("  Mesh size:  {:.3} x {:.3} x {:.3}", size.x, size.y, size.z);
            }
            match valid {
                Ok(()) => println!("  Valid:      yes"),
                Err(e) => println!("  Valid:      no ({})", e),
            }
        }
    }

    Ok(())
}
