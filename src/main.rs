//! ncarve entrypoint: raster images in, CNC milling programs out.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use ncarve::desc::{parse_carve_json, CarveDesc};
use ncarve::gcode::{CarveAxes, Gcode, PassPolicy};
use ncarve::heightmap::Heightmap;
use ncarve::im::io::load_lum8;
use ncarve::im::Lum8Im;
use ncarve::path::Paths;
use ncarve::point::PointSet;
use ncarve::trace::{points_by_border_trace, points_by_color_edge, points_by_thinning};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "ncarve", version, about = "Raster images to CNC milling programs")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Optional JSON file overriding the emitter defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trace line art into centre-line cut paths.
    Trace(TraceArgs),
    /// Carve a grayscale heightmap with boustrophedon sweeps.
    Relief(ReliefArgs),
}

#[derive(clap::Args, Debug)]
struct TraceArgs {
    /// Input image (PNG, JPEG, ...).
    input: PathBuf,
    /// Output toolpath program.
    output: PathBuf,

    /// Physical size of the longest pixel axis, mm.
    #[arg(long)]
    size_mm: f64,
    /// Bit diameter, mm.
    #[arg(long)]
    bit_mm: f64,
    /// Target cut depth, mm.
    #[arg(long)]
    depth_mm: f64,

    /// Intensities below this count as line ink.
    #[arg(long, default_value_t = 128)]
    threshold: u8,
    /// How to turn the raster into points.
    #[arg(long, value_enum, default_value_t = Extract::Thin)]
    extract: Extract,
    /// Paths shorter than this many pixels are dropped.
    #[arg(long, default_value_t = 2)]
    min_path_len: usize,
    /// Path simplification tolerance, pixels.
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,
    /// Depth progression across passes.
    #[arg(long, value_enum, default_value_t = Passes::HalfBit)]
    passes: Passes,
    /// Step per pass, mm (with --passes step; defaults to the config value).
    #[arg(long)]
    step_mm: Option<f64>,
    /// Write a PNG overlay of the extracted points for inspection.
    #[arg(long)]
    dump: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ReliefArgs {
    /// Input grayscale heightmap image.
    input: PathBuf,
    /// Output toolpath program.
    output: PathBuf,

    /// Physical size of the longest pixel axis, mm.
    #[arg(long)]
    size_mm: f64,
    /// Bit diameter, mm.
    #[arg(long)]
    bit_mm: f64,
    /// Depth carved where the heightmap reads 0, mm.
    #[arg(long, default_value_t = 0.0)]
    min_depth_mm: f64,
    /// Depth carved where the heightmap reads 1, mm.
    #[arg(long)]
    max_depth_mm: f64,

    /// Which cross-sections to sweep.
    #[arg(long, value_enum, default_value_t = Axes::Rows)]
    axes: Axes,
    /// Depth progression across passes.
    #[arg(long, value_enum, default_value_t = Passes::HalfBit)]
    passes: Passes,
    /// Step per pass, mm (with --passes step; defaults to the config value).
    #[arg(long)]
    step_mm: Option<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Extract {
    /// Thin strokes to their one-pixel skeleton.
    Thin,
    /// Inner boundary of white regions.
    Border,
    /// Edges between grayscale regions, on the brighter side.
    ColorEdge,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Passes {
    Single,
    HalfBit,
    Step,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Axes {
    Rows,
    Columns,
    Both,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let desc = load_desc(args.config.as_deref())?;

    match args.command {
        Command::Trace(trace) => run_trace(desc, trace),
        Command::Relief(relief) => run_relief(desc, relief),
    }
}

fn load_desc(path: Option<&std::path::Path>) -> Result<CarveDesc> {
    let Some(path) = path else {
        return Ok(CarveDesc::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    parse_carve_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn pass_policy(passes: Passes, step_mm: Option<f64>, desc: &CarveDesc) -> Result<PassPolicy> {
    Ok(match passes {
        Passes::Single => PassPolicy::SinglePass,
        Passes::HalfBit => {
            if step_mm.is_some() {
                bail!("--step-mm only applies with --passes step");
            }
            PassPolicy::HalfBit
        }
        Passes::Step => PassPolicy::FixedStep(step_mm.unwrap_or(desc.depth_step_mm)),
    })
}

fn mm_per_px(size_mm: f64, im: &Lum8Im) -> Result<f64> {
    let longest = im.w.max(im.h);
    if size_mm <= 0.0 {
        bail!("--size-mm must be positive");
    }
    Ok(size_mm / longest as f64)
}

fn run_trace(desc: CarveDesc, args: TraceArgs) -> Result<()> {
    let img = load_lum8(&args.input)
        .with_context(|| format!("reading image {}", args.input.display()))?;
    let ratio = mm_per_px(args.size_mm, &img)?;

    let points: PointSet = match args.extract {
        Extract::Thin => points_by_thinning(&img.to_binary(args.threshold)),
        Extract::Border => points_by_border_trace(&img.to_binary(args.threshold)),
        Extract::ColorEdge => points_by_color_edge(&img),
    };
    info!("extracted {} points from {}", points.len(), args.input.display());

    if let Some(dump) = &args.dump {
        let mut overlay = Lum8Im::new(img.w, img.h);
        for p in &points {
            p.stamp(&mut overlay, 255, desc.dot_px);
        }
        overlay
            .save_png(dump)
            .with_context(|| format!("writing overlay {}", dump.display()))?;
    }

    let mut paths = Paths::from_points(&points, args.min_path_len)?;
    paths.compress(args.tolerance);
    info!("traced {} paths", paths.len());

    let policy = pass_policy(args.passes, args.step_mm, &desc)?;
    let mut gcode = Gcode::new(desc, ratio, args.bit_mm)?;
    gcode.carve_paths(&paths, args.depth_mm, policy)?;
    gcode.export(&args.output)
        .with_context(|| format!("writing program {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}

fn run_relief(desc: CarveDesc, args: ReliefArgs) -> Result<()> {
    let img = load_lum8(&args.input)
        .with_context(|| format!("reading image {}", args.input.display()))?;
    let ratio = mm_per_px(args.size_mm, &img)?;

    let map = Heightmap::from_lum8(&img)?;
    let axes = match args.axes {
        Axes::Rows => CarveAxes::Rows,
        Axes::Columns => CarveAxes::Columns,
        Axes::Both => CarveAxes::Both,
    };

    let policy = pass_policy(args.passes, args.step_mm, &desc)?;
    let mut gcode = Gcode::new(desc, ratio, args.bit_mm)?;
    gcode.carve_heightmap(&map, args.min_depth_mm, args.max_depth_mm, policy, axes)?;
    gcode.export(&args.output)
        .with_context(|| format!("writing program {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}
