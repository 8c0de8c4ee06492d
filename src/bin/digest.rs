//! digest - per-object summary and annotated stills for one video

use anyhow::{anyhow, Result};
use clap::Parser;
use detection_digest::config::DigestConfig;
use detection_digest::timing::parse_duration;
use detection_digest::{
    AnnotationStyle, ClockChoice, FileConfig, LabelTable, ModelKind, ModelRegistry, ReplayLoader,
    VideoDigest,
};
use std::io::IsTerminal;
use std::path::PathBuf;

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Local video file (or `stub://name` for a synthetic source).
    #[arg(long)]
    video: String,
    /// Recorded tracker output for the video, one JSON frame result per line.
    #[arg(long)]
    detections: PathBuf,
    /// Class label table (JSON list or `{"0": "person"}` map). Defaults to COCO.
    #[arg(long)]
    labels: Option<PathBuf>,
    /// Known video duration (ISO-8601 such as `PT1M30S`, or seconds).
    /// Timestamps are spread evenly over the tracked frames.
    #[arg(long, conflicts_with = "fps")]
    duration: Option<String>,
    /// Constant frame rate; read from the video when omitted.
    #[arg(long)]
    fps: Option<f64>,
    /// Model size (nano|medium|xl|custom). Overrides the config file.
    #[arg(long, env = "DIGEST_MODEL")]
    model: Option<String>,
    /// Skip writing annotated images.
    #[arg(long)]
    no_images: bool,
    /// Also write the summary table as HTML to this path.
    #[arg(long)]
    html: Option<PathBuf>,
    /// Frame count of a `stub://` video.
    #[arg(long, default_value_t = 0)]
    synthetic_frames: u64,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = DigestConfig::load()?;
    log::info!("profile {:?}", cfg.profile);

    let kind = args
        .model
        .as_deref()
        .map(ModelKind::from_name)
        .unwrap_or(cfg.tracking.model);
    let clock = match args.duration.as_deref() {
        Some(text) => ClockChoice::Duration(parse_duration(text)?),
        None => ClockChoice::Fps(args.fps),
    };
    let labels = match args.labels.as_ref().or(cfg.labels_path.as_ref()) {
        Some(path) => LabelTable::load(path)?,
        None => LabelTable::coco(),
    };
    let video = FileConfig {
        synthetic_frames: args.synthetic_frames,
        ..FileConfig::new(args.video.clone())
    };

    let loader = ReplayLoader::new(&args.detections);
    let mut registry = ModelRegistry::default();
    let digest = {
        let mut stage = ui.stage("Track objects");
        let digest = VideoDigest::process_video(
            &mut registry,
            &loader,
            kind,
            &video,
            &cfg.tracking.params,
            clock,
            labels,
        )?;
        stage.outcome(format!("{} tracks", digest.summaries().len()));
        digest
    };

    let csv_path = {
        let _stage = ui.stage("Write CSV");
        digest.write_csv(&cfg.csv_dir)?
    };
    println!("csv: {}", csv_path.display());

    if let Some(path) = &args.html {
        let _stage = ui.stage("Write HTML");
        digest.write_html(path)?;
        println!("html: {}", path.display());
    }

    if args.no_images {
        return Ok(());
    }

    let mut style = AnnotationStyle::default();
    if let Some(path) = &cfg.font_path {
        style = style.with_font(AnnotationStyle::load_font(path)?);
    }
    let report = {
        let mut stage = ui.stage("Write images");
        let report = digest
            .write_images(&video, &cfg.image_dir, &style)
            .map_err(|e| anyhow!("image export failed: {:#}", e))?;
        stage.outcome(format!(
            "{} images from {} frames",
            report.images.len(),
            report.frames_read
        ));
        report
    };
    for path in &report.images {
        println!("image: {}", path.display());
    }
    Ok(())
}
