//! flexfold CLI - bend flat flex-PCB layer meshes into 3D
//!
//! Reads a JSON project listing layer STL files and transformations, runs
//! the deformation engine and writes the bent board as STL.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flexfold::{DeformationEngine, Project, TracingProgress};
use flexfold_mesh::strip;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod stl;

#[derive(Parser)]
#[command(name = "flexfold")]
#[command(about = "Bend, fold and spiral flex-PCB layer meshes", long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deform the layers of a project and export the result
    Run {
        /// Project JSON file
        project: PathBuf,
        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,
        /// Only deform the substrate layer
        #[arg(long)]
        only_baselayer: bool,
        /// Also write transformation outlines and the fixed scope as JSON
        #[arg(long)]
        outlines: Option<PathBuf>,
        /// Directory layer files are relative to (default: the project's)
        #[arg(long)]
        layers_dir: Option<PathBuf>,
    },
    /// Display information about a project
    Info {
        /// Project JSON file
        project: PathBuf,
    },
    /// Write a rectangular test strip
    Strip {
        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,
        /// Length along X (mm)
        #[arg(long, default_value_t = 120.0)]
        length: f64,
        /// Width along Y (mm)
        #[arg(long, default_value_t = 20.0)]
        width: f64,
        /// Thickness along Z (mm)
        #[arg(long, default_value_t = 0.1)]
        thickness: f64,
        /// Largest grid cell (mm)
        #[arg(long, default_value_t = 1.0)]
        resolution: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            project,
            output,
            only_baselayer,
            outlines,
            layers_dir,
        } => run(
            &project,
            &output,
            only_baselayer,
            outlines.as_deref(),
            layers_dir.as_deref(),
        )?,
        Commands::Info { project } => show_info(&project)?,
        Commands::Strip {
            output,
            length,
            width,
            thickness,
            resolution,
        } => {
            let mesh = strip(length, width, thickness, resolution)?;
            stl::write_stl(&mesh, &output)?;
            println!(
                "Wrote {} x {} x {} strip ({} triangles) to {}",
                length,
                width,
                thickness,
                mesh.num_triangles(),
                output.display()
            );
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(
    project_path: &Path,
    output: &Path,
    only_baselayer: bool,
    outlines: Option<&Path>,
    layers_dir: Option<&Path>,
) -> Result<()> {
    let mut project = Project::load(project_path)
        .with_context(|| format!("loading project {}", project_path.display()))?;
    if only_baselayer {
        project.engine.only_baselayer = true;
    }
    let dir = layers_dir
        .or_else(|| project_path.parent())
        .unwrap_or_else(|| Path::new("."));

    let mut meshes = Vec::with_capacity(project.layers.len());
    for (i, layer) in project.layers.iter().enumerate() {
        let path = project.layer_path(i, dir);
        let mesh = stl::load_stl(&path).with_context(|| format!("layer {}", layer.name))?;
        info!(
            layer = %layer.name,
            triangles = mesh.num_triangles(),
            vertices = mesh.num_vertices(),
            "Loaded layer"
        );
        meshes.push(mesh);
    }

    let mut engine = project.build_engine(meshes)?;
    let mut progress = TracingProgress::new();
    engine.assign(&mut progress)?;
    engine.render(&mut progress)?;
    let result = engine.result()?;

    stl::write_stl(&result.mesh, output)?;
    info!(
        triangles = result.mesh.num_triangles(),
        layers = result.layers.len(),
        path = %output.display(),
        "Wrote result"
    );

    if let Some(path) = outlines {
        write_outlines(&engine, path)?;
    }
    if !engine.warnings().is_empty() {
        warn!(count = engine.warnings().len(), "Finished with warnings");
    }
    Ok(())
}

fn write_outlines(engine: &DeformationEngine, path: &Path) -> Result<()> {
    let doc = serde_json::json!({
        "transformations": engine.outlines(),
        "fixed_scope": engine.fixed_scope_outline(),
        "warnings": engine.warnings(),
    });
    fs::write(path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Wrote outlines");
    Ok(())
}

fn show_info(path: &Path) -> Result<()> {
    let project =
        Project::load(path).with_context(|| format!("loading project {}", path.display()))?;

    println!("flexfold project: {}", path.display());
    println!("  Layers: {}", project.layers.len());
    println!("  Transformations: {}", project.transformations.len());

    if !project.layers.is_empty() {
        println!("\nLayers:");
        for (i, layer) in project.layers.iter().enumerate() {
            match project.layer_mel(i) {
                Ok((mel, mel_trans, mel_residual)) => println!(
                    "  {}: {} ({}) mel {} / {} / {}",
                    i,
                    layer.name,
                    layer.file.display(),
                    mel,
                    mel_trans,
                    mel_residual
                ),
                Err(e) => println!("  {}: {} ({}) {}", i, layer.name, layer.file.display(), e),
            }
        }
    }

    match project.transformations_by_priority() {
        Ok(list) if !list.is_empty() => {
            println!("\nTransformations (by priority):");
            for t in &list {
                println!(
                    "  [{}] {} {}{}",
                    t.priority(),
                    t.kind(),
                    t.name(),
                    if t.emits_residual() { " +residual" } else { "" }
                );
            }
        }
        Ok(_) => {}
        Err(e) => println!("\nFailed to decode transformations: {}", e),
    }

    Ok(())
}
