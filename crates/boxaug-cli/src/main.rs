//! Command-line driver: augments every annotated image of a dataset.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use boxaug_core::{AugmentConfig, Augmenter};
use clap::Parser;
use log::{error, info};

/// Write 8 rotated/flipped variants of every Pascal VOC annotated image.
#[derive(Parser, Debug)]
#[command(name = "boxaug", version, about)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the source images (`<images>/<folder>/<filename>`)
    #[arg(long)]
    images: Option<PathBuf>,

    /// Directory of the source `*.xml` annotations
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Output root for the augmented images
    #[arg(long)]
    output_images: Option<PathBuf>,

    /// Output directory for the augmented annotations
    #[arg(long)]
    output_annotations: Option<PathBuf>,

    /// Rename objects after the annotation file-name prefix
    #[arg(long)]
    relabel: bool,

    /// Prefix for relabelled object names
    #[arg(long, requires = "relabel")]
    label_prefix: Option<String>,

    /// Log every written variant
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Defaults, then the config file, then explicit flags.
    fn resolve_config(&self) -> Result<AugmentConfig> {
        let mut config = match &self.config {
            Some(path) => AugmentConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => AugmentConfig::default(),
        };

        if let Some(dir) = &self.images {
            config.image_dir = dir.clone();
        }
        if let Some(dir) = &self.annotations {
            config.annotation_dir = dir.clone();
        }
        if let Some(dir) = &self.output_images {
            config.output_image_dir = dir.clone();
        }
        if let Some(dir) = &self.output_annotations {
            config.output_annotation_dir = dir.clone();
        }
        if self.relabel {
            config.relabel_from_file_stem = true;
        }
        if let Some(prefix) = &self.label_prefix {
            config.label_prefix = prefix.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the batch; `Ok(false)` when some items failed.
fn run(args: &Args) -> Result<bool> {
    let config = args.resolve_config()?;
    info!(
        "Augmenting {} -> {}",
        config.annotation_dir.display(),
        config.output_annotation_dir.display()
    );

    let report = Augmenter::new(config)
        .run()
        .context("batch augmentation failed")?;

    for failure in &report.failed {
        error!("FAILED {}: {}", failure.annotation.display(), failure.error);
    }
    info!(
        "{} succeeded, {} failed, {} variants written",
        report.succeeded.len(),
        report.failed.len(),
        report.outputs_written()
    );

    Ok(report.is_complete())
}
