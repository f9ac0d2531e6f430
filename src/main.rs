use anyhow::{Context, Result};
use clap::Parser;
use lane_detect::config::{parse_hsv, BlendParams, ColorRange, DetectorConfig};
use lane_detect::detection::{create_default_detector, Hsv};
use lane_detect::media::Fourcc;
use lane_detect::pipeline::{self, OutputSettings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Images and videos to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for annotated images
    #[arg(long, default_value = "results/images")]
    image_dir: PathBuf,

    /// Directory for annotated and mask videos
    #[arg(long, default_value = "results/videos")]
    video_dir: PathBuf,

    /// Directory for image masks
    #[arg(long, default_value = "results/masks")]
    mask_dir: PathBuf,

    /// Directory for the run log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Extension (and format) for image outputs
    #[arg(long, default_value = "jpg")]
    image_ext: String,

    /// Four-character codec tag for video outputs
    #[arg(long, default_value = "mp4v")]
    fourcc: Fourcc,

    /// Lower HSV bound as h,s,v (hue 0-179)
    #[arg(long, default_value = "10,90,100", value_parser = parse_hsv)]
    hsv_lower: Hsv,

    /// Upper HSV bound as h,s,v (hue 0-179)
    #[arg(long, default_value = "30,255,255", value_parser = parse_hsv)]
    hsv_upper: Hsv,

    /// Weight of the source frame in the overlay blend
    #[arg(long, default_value_t = 0.8)]
    source_weight: f32,

    /// Weight of the lane layer in the overlay blend
    #[arg(long, default_value_t = 1.0)]
    overlay_weight: f32,

    /// Constant added after blending
    #[arg(long, default_value_t = 0.0)]
    gamma: f32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Don't print the log file at the end of the run
    #[arg(long)]
    no_summary: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let timestamp = pipeline::run_timestamp();
    let run_log = lane_detect::logging::init(&args.log_dir, &timestamp, args.debug)
        .context("Failed to initialize logging")?;

    tracing::info!("--- Lane Detection Started ---");
    tracing::info!("Logging to {}", run_log.path().display());

    let color_range = ColorRange::new(args.hsv_lower, args.hsv_upper)
        .context("Failed to initialize lane detector")?;
    let detector = create_default_detector(DetectorConfig {
        color_range,
        blend: BlendParams {
            source_weight: args.source_weight,
            overlay_weight: args.overlay_weight,
            gamma: args.gamma,
        },
        ..DetectorConfig::default()
    });

    let settings = OutputSettings {
        image_dir: args.image_dir,
        video_dir: args.video_dir,
        mask_dir: args.mask_dir,
        image_ext: args.image_ext,
        fourcc: args.fourcc,
    };

    let summary = pipeline::run_batch(&detector, &args.inputs, &settings);
    summary.log();

    tracing::info!("--- Lane Detection Completed ---");

    if !args.no_summary {
        match run_log.read() {
            Ok(contents) => {
                println!("\n--- Log Output ---");
                println!("{contents}");
            }
            Err(e) => eprintln!("[ERROR] Unable to read log file: {e}"),
        }
    }

    Ok(())
}
