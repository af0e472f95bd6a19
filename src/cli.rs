use crate::config::{Config, apply_config_file, load_config};
use crate::ir::{Camera, StickyState};
use crate::layout::{LabelLayout, LayoutParams, Projector, compute_label_layout, marker_footprints};
use crate::layout_dump::{SceneDump, write_scene_dump};
use crate::parser::{Scene, parse_scene};
use crate::render::{render_svg, write_output_svg};
use crate::text_metrics::fill_missing_label_sizes;
use crate::theme::Theme;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "mldc", version, about = "Declutter map POI labels for a camera path")]
pub struct Args {
    /// Scene file (.json5/.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Only emit this frame (0-based). Earlier frames still feed sticky state.
    #[arg(short = 'f', long = "frame")]
    pub frame: Option<usize>,

    /// Estimate label widths from character counts instead of font metrics
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// Log layout decisions (same as RUST_LOG=debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let parsed = parse_scene(&input)?;
    if let Some(inline) = parsed.config {
        apply_config_file(&mut config, inline);
    }
    if args.fast_text {
        config.render.fast_text = true;
    }

    let mut scene = parsed.scene;
    let filled = fill_missing_label_sizes(
        &mut scene.candidates,
        &config.theme,
        config.render.fast_text,
    );
    tracing::debug!(filled, "estimated label sizes from titles");

    let last = scene.frames.len() - 1;
    if let Some(index) = args.frame
        && index > last
    {
        return Err(anyhow::anyhow!(
            "Frame {} out of range (scene has {} frames)",
            index,
            scene.frames.len()
        ));
    }
    let stop = args.frame.unwrap_or(last);
    let layouts = run_frames(&scene, &config, stop);

    match args.output_format {
        OutputFormat::Json => {
            let frames = scene
                .frames
                .iter()
                .copied()
                .zip(layouts.iter())
                .enumerate()
                .map(|(index, (camera, layout))| (index, camera, layout))
                .skip(args.frame.unwrap_or(0));
            let dump = SceneDump::from_frames(scene.viewport, frames);
            write_scene_dump(args.output.as_deref(), &dump)?;
        }
        OutputFormat::Svg => {
            let svg = frame_svg(&scene, &config, stop, &layouts[stop]);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = frame_svg(&scene, &config, stop, &layouts[stop]);
            write_png(&svg, &output, &config.theme)?;
        }
    }

    Ok(())
}

/// Lay out frames `0..=stop` in order, feeding each result into the next
/// frame's sticky state.
pub fn run_frames(scene: &Scene, config: &Config, stop: usize) -> Vec<LabelLayout> {
    let mut sticky = scene.sticky.clone();
    let mut layouts = Vec::with_capacity(stop + 1);
    for (index, camera) in scene.frames.iter().take(stop + 1).enumerate() {
        let layout = compute_label_layout(&LayoutParams {
            candidates: &scene.candidates,
            camera: *camera,
            viewport: scene.viewport,
            config: &config.declutter,
            sticky: &sticky,
            forced: &scene.forced,
        });
        tracing::info!(
            frame = index,
            zoom = camera.zoom,
            placed = layout.placements.len(),
            hash = %layout.hash,
            "frame laid out"
        );
        sticky = StickyState::from_layout(&layout);
        layouts.push(layout);
    }
    layouts
}

fn frame_svg(scene: &Scene, config: &Config, index: usize, layout: &LabelLayout) -> String {
    let camera: Camera = scene.frames[index];
    let projector = Projector::new(&camera, scene.viewport);
    let markers = marker_footprints(&scene.candidates, &projector, scene.viewport);
    render_svg(layout, &markers, scene.viewport, &config.theme, &config.render)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    crate::render::write_output_png(svg, output, theme)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
