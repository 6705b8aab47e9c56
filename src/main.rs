use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faceroll::{annotate, builder, config, recognize, storage, Pipeline};
use faceroll_vision::video::Camera;
use image::DynamicImage;
use log::{info, warn};

#[derive(Parser)]
#[command(name = "faceroll")]
#[command(version, about = "Recognize people in a photo against a gallery of known faces")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the gallery from a directory of labeled photos
    Build {
        /// Photo directory (files named `<person>_<anything>.jpg`)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Gallery file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recognize faces in a photo or a single camera frame
    Recognize {
        /// Image to recognize; omit with --camera
        #[arg(required_unless_present = "camera", conflicts_with = "camera")]
        image: Option<PathBuf>,
        /// Capture one frame from the configured camera instead
        #[arg(long)]
        camera: bool,
        /// Write the annotated image here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the match distance threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the people enrolled in the gallery
    List {
        /// Gallery file to read
        #[arg(short, long)]
        gallery: Option<PathBuf>,
    },
    /// Open config file in editor
    Config {
        /// Write a default config file instead of editing
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let cfg = config::load_config(config_path)?;

    match cli.command {
        Commands::Build { dataset, output } => {
            let dataset = dataset.unwrap_or_else(|| cfg.dataset.clone());
            let output = output.unwrap_or_else(|| cfg.gallery.clone());
            build(&cfg, &dataset, &output)
        }
        Commands::Recognize {
            image: input,
            camera,
            output,
            threshold,
            json,
        } => {
            let threshold = threshold.unwrap_or(cfg.threshold);
            let frame = match input {
                Some(path) if !camera => image::open(&path)
                    .with_context(|| format!("Failed to open image {}", path.display()))?,
                _ => capture(&cfg)?,
            };
            recognize_frame(&cfg, frame, threshold, output.as_deref(), json)
        }
        Commands::List { gallery } => list(&gallery.unwrap_or_else(|| cfg.gallery.clone())),
        Commands::Config { init } => {
            let path = config_path.unwrap_or(&config::CONFIG_PATH);
            if init {
                config::save_config(&cfg, Some(path))?;
                info!("✓ Config written to {}", path.display());
                Ok(())
            } else {
                open_config(path)
            }
        }
    }
}

fn pipeline(cfg: &config::Config) -> Result<Pipeline> {
    Ok(Pipeline::new(&cfg.models())
        .context("Failed to initialize face recognition pipeline")?
        .with_thresholds(cfg.score_threshold, cfg.nms_threshold))
}

fn build(cfg: &config::Config, dataset: &Path, output: &Path) -> Result<()> {
    info!("Building gallery from {}", dataset.display());
    let mut pipeline = pipeline(cfg)?;

    let stats = builder::build_gallery(&mut pipeline, dataset, output)
        .context("Failed to build gallery")?;

    info!(
        "✓ {} of {} image(s) enrolled ({} without a face, {} failed)",
        stats.enrolled, stats.scanned, stats.no_face, stats.failed
    );
    Ok(())
}

fn capture(cfg: &config::Config) -> Result<DynamicImage> {
    info!("Opening camera: {}", cfg.camera);
    let mut camera = Camera::open(&cfg.camera).context("Failed to open camera")?;
    let frame = camera
        .still(cfg.warmup_frames)
        .context("Failed to capture frame")?;
    Ok(DynamicImage::ImageRgb8(frame))
}

fn recognize_frame(
    cfg: &config::Config,
    frame: DynamicImage,
    threshold: f32,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    // Loaded once and lent to the recognition pass.
    let gallery = storage::load_gallery_or_empty(&cfg.gallery).context("Failed to load gallery")?;
    info!("Gallery: {} face(s)", gallery.len());

    let mut pipeline = pipeline(cfg)?;
    let faces = recognize::recognize(&mut pipeline, &gallery, &frame, threshold)
        .context("Recognition failed")?;

    if faces.is_empty() {
        warn!("No faces detected in the image");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&faces)?);
    } else {
        for face in &faces {
            let [x, y, w, h] = face.region;
            let result = &face.result;
            if result.matched {
                println!(
                    "{} ({}%) at {:.0},{:.0} {:.0}x{:.0}",
                    result.name, result.confidence, x, y, w, h
                );
            } else {
                println!("{} at {:.0},{:.0} {:.0}x{:.0}", result.name, x, y, w, h);
            }
        }
    }

    if let Some(output) = output {
        let mut canvas = frame.to_rgb8();
        annotate::draw_annotations(
            &mut canvas,
            &annotate::annotations(&faces, &cfg.label_prefix),
        );
        canvas
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("✓ Annotated image written to {}", output.display());
    }
    Ok(())
}

fn list(gallery_path: &Path) -> Result<()> {
    let gallery = storage::load_gallery(gallery_path)
        .with_context(|| format!("Failed to load gallery {}", gallery_path.display()))?;

    info!("{} face(s) in {}", gallery.len(), gallery_path.display());
    for (name, count) in gallery.people() {
        println!("{name}\t{count}");
    }
    Ok(())
}

fn open_config(path: &Path) -> Result<()> {
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {}", path.display());

    let status = std::process::Command::new(editor)
        .arg(path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
