//! smear-bench: CLI tool for pipeline parameter experimentation and timing.
//!
//! Drives the effect pipeline over synthetic moving test-pattern frames
//! with configurable parameters, printing per-run and per-group timing
//! summaries. Useful for:
//!
//! - Measuring sustained frames-per-second at a given resolution
//! - Comparing the cost of individual stage groups
//! - Checking a `Params` JSON blob before wiring it to a live source
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin smear-bench -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use smear_pipeline::{Frame, Params, Pipeline};

/// Pipeline timing and parameter experimentation for smear.
///
/// Feeds synthetic moving test-pattern frames through the full effect
/// pipeline and reports wall-clock timings.
#[derive(Parser)]
#[command(name = "smear-bench", version)]
struct Cli {
    /// Frame width in pixels.
    #[arg(long, default_value_t = 640, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    width: u32,

    /// Frame height in pixels.
    #[arg(long, default_value_t = 480, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    height: u32,

    /// Number of frames per run.
    #[arg(long, default_value_t = 120, value_parser = clap::builder::RangedU64ValueParser::<u64>::new().range(1..))]
    frames: u64,

    /// Simulated capture rate, used to derive the session clock.
    #[arg(long, default_value_t = 30, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    fps: u32,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Random seed; omit for OS entropy.
    #[arg(long)]
    seed: Option<u64>,

    /// Full parameter set as a JSON string.
    ///
    /// Missing fields keep their defaults; numeric fields are clamped
    /// to their declared ranges.
    #[arg(long)]
    params_json: Option<String>,

    /// Time each stage group in isolation instead of one combined run.
    #[arg(long)]
    profile_groups: bool,

    /// Write the final frame of the first run as PNG.
    #[arg(long)]
    save_png: Option<PathBuf>,

    /// Output the summary as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Synthetic camera stand-in: a diagonal gradient with a bright block
/// orbiting the center, so temporal stages always see motion.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn test_pattern(width: u32, height: u32, index: u64) -> Frame {
    let t = index as f32 / 30.0;
    let cx = (width as f32 / 2.0) + (width as f32 / 4.0) * t.sin();
    let cy = (height as f32 / 2.0) + (height as f32 / 4.0) * (t * 0.7).cos();
    Frame::from_fn(width, height, |x, y| {
        let base_r = ((x * 255) / width.max(1)) as u8;
        let base_g = ((y * 255) / height.max(1)) as u8;
        let near = (x as f32 - cx).hypot(y as f32 - cy) < 40.0;
        if near {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([base_r, base_g, 128])
        }
    })
}

fn params_from_cli(cli: &Cli) -> Result<Params, String> {
    let Some(ref json) = cli.params_json else {
        return Ok(Params::default());
    };
    let mut params: Params =
        serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"))?;
    params.clamp();
    Ok(params)
}

fn pipeline_from_cli(cli: &Cli) -> Pipeline {
    cli.seed.map_or_else(Pipeline::new, Pipeline::seeded)
}

/// One run over the synthetic stream; returns per-frame durations and
/// the final output frame.
fn run_once(cli: &Cli, params: &Params, pipeline: &mut Pipeline) -> Result<(Vec<Duration>, Frame), String> {
    let frame_interval = Duration::from_secs(1) / cli.fps;
    let mut durations = Vec::with_capacity(usize::try_from(cli.frames).unwrap_or_default());
    let mut last = Frame::new(cli.width, cli.height);
    for index in 0..cli.frames {
        let frame = test_pattern(cli.width, cli.height, index);
        let elapsed = frame_interval * u32::try_from(index).unwrap_or(u32::MAX);
        let started = Instant::now();
        last = pipeline
            .process(&frame, params, elapsed)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        durations.push(started.elapsed());
    }
    Ok((durations, last))
}

#[allow(clippy::cast_precision_loss)]
fn summarize(durations: &[Duration]) -> (f64, f64, f64) {
    let ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    let min = ms.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = ms.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = ms.iter().sum::<f64>() / ms.len().max(1) as f64;
    (min, mean, max)
}

/// Canonical single-group presets for `--profile-groups`.
fn group_presets() -> Vec<(&'static str, Params)> {
    let preset = |f: fn(&mut Params)| {
        let mut params = Params::default();
        f(&mut params);
        params
    };
    vec![
        ("split", preset(|p| p.split_mode = smear_pipeline::SplitMode::QuadMirror)),
        ("temporal", preset(|p| p.motion_trail = 15)),
        ("temporal-abuse", preset(|p| p.time_smear = 60)),
        ("destructive-color", preset(|p| p.palette_decay = 40)),
        ("digital-violence", preset(|p| p.comp_artifacts = 60)),
        ("spatial-chaos", preset(|p| p.non_euclidean = 20)),
        ("perception", preset(|p| p.impossible_colors = 60)),
        ("hybrids", preset(|p| p.temp_blur_field = 60)),
        ("minimalism", preset(|p| p.reality_quantizer = 60)),
        ("performance-art", preset(|p| p.machine_fatigue = 60)),
        ("boost", preset(|p| p.boost_radial_blur = 60)),
        ("optical", preset(|p| {
            p.optical_mode = smear_pipeline::OpticalMode::Swirl;
            p.optical_amount = 60;
        })),
        ("glitch", preset(|p| p.vhs_noise = 60)),
        ("stylize", preset(|p| p.edge_mode = smear_pipeline::EdgeMode::Canny)),
        ("looks", preset(|p| p.look_mode = smear_pipeline::LookMode::Sepia)),
        ("light", preset(|p| p.vignette = 60)),
        ("texture", preset(|p| p.texture_mode = smear_pipeline::TextureMode::Watercolor)),
        ("basic", preset(|p| p.pixelate = 8)),
    ]
}

fn profile_groups(cli: &Cli) -> Result<(), String> {
    println!("{:<20} {:>12} {:>10}", "Group", "Mean (ms)", "FPS");
    println!("{}", "-".repeat(44));
    for (name, params) in group_presets() {
        let mut pipeline = pipeline_from_cli(cli);
        let (durations, _) = run_once(cli, &params, &mut pipeline)?;
        let (_, mean, _) = summarize(&durations);
        let fps = if mean > 0.0 { 1000.0 / mean } else { 0.0 };
        println!("{name:<20} {mean:>10.3}ms {fps:>10.1}");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let params = params_from_cli(cli)?;

    eprintln!("Frames: {}x{} x {} @ {} fps", cli.width, cli.height, cli.frames, cli.fps);
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    if cli.profile_groups {
        return profile_groups(cli);
    }

    let mut run_means = Vec::with_capacity(cli.runs);
    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }
        let mut pipeline = pipeline_from_cli(cli);
        let (durations, last) = run_once(cli, &params, &mut pipeline)?;
        let (min, mean, max) = summarize(&durations);
        run_means.push(mean);

        if cli.json {
            let summary = serde_json::json!({
                "run": run,
                "frames": cli.frames,
                "width": cli.width,
                "height": cli.height,
                "frame_ms": { "min": min, "mean": mean, "max": max },
                "fps": if mean > 0.0 { 1000.0 / mean } else { 0.0 },
            });
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| format!("Error serializing summary: {e}"))?;
            println!("{json}");
        } else {
            println!("Frame time: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");
            if mean > 0.0 {
                println!("Sustained: {:.1} fps", 1000.0 / mean);
            }
        }

        if run == 0
            && let Some(ref png_path) = cli.save_png
        {
            last.save(png_path)
                .map_err(|e| format!("Error writing PNG to {}: {e}", png_path.display()))?;
            eprintln!("PNG written to {}", png_path.display());
        }
    }

    if cli.runs > 1 {
        #[allow(clippy::cast_precision_loss)]
        let overall = run_means.iter().sum::<f64>() / run_means.len().max(1) as f64;
        println!();
        println!("Summary ({} runs)\n{}", cli.runs, "=".repeat(60));
        println!("Mean frame time across runs: {overall:.3}ms");
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_moves_between_frames() {
        let a = test_pattern(64, 48, 0);
        let b = test_pattern(64, 48, 15);
        assert_eq!(a.dimensions(), (64, 48));
        assert_ne!(a, b);
    }

    #[test]
    fn group_presets_cover_every_group_once() {
        let presets = group_presets();
        assert_eq!(presets.len(), 18);
        for (name, params) in &presets {
            assert_ne!(*params, Params::default(), "{name} preset is all-off");
        }
    }

    #[test]
    fn params_json_round_trip_with_clamp() {
        let cli = Cli::parse_from([
            "smear-bench",
            "--params-json",
            r#"{"motion_trail": 900, "invert": true}"#,
        ]);
        let params = params_from_cli(&cli).expect("valid JSON");
        assert_eq!(params.motion_trail, 60);
        assert!(params.invert);
    }
}
