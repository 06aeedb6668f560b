//! Batch augmentation of a Pascal VOC dataset.
//!
//! For every `*.xml` record in the annotation directory, the referenced
//! image is loaded and each variant chain is applied to it. Variant `i` of
//! `name.ext` is written as `name_i.ext`, with an updated record
//! `anno_i.xml`.
//!
//! Items are independent: they run in parallel, and a failing item is
//! recorded in the [`BatchReport`] without stopping the others.

mod config;
mod report;

pub use config::AugmentConfig;
pub use report::{BatchReport, ItemFailure, ItemReport, VariantOutput};

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::annotation::{AnnotationError, VocAnnotation};
use crate::decode::{load_image, ImageIoError};
use crate::encode::save_image;
use crate::transform::{check_boxes, standard_variants, TransformChain, TransformError};

/// Errors of a batch run or of one of its items.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A directory or file needed by the run could not be accessed.
    #[error("Cannot access {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An annotation record could not be read or written.
    #[error("Annotation {path}: {source}")]
    Annotation {
        path: PathBuf,
        #[source]
        source: AnnotationError,
    },

    /// An image could not be loaded or saved.
    #[error("Image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: ImageIoError,
    },

    /// The record's boxes are unusable.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A file name is missing or not valid UTF-8.
    #[error("Unusable file name: {0}")]
    FileName(PathBuf),
}

/// Runs variant chains over every annotation of a dataset.
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
    variants: Vec<TransformChain>,
}

impl Augmenter {
    /// Create an augmenter with the eight standard variants.
    pub fn new(config: AugmentConfig) -> Self {
        Self {
            config,
            variants: standard_variants(),
        }
    }

    /// Replace the variant plan; chain `i` produces outputs suffixed `_i`.
    pub fn with_variants(mut self, variants: Vec<TransformChain>) -> Self {
        self.variants = variants;
        self
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    pub fn variants(&self) -> &[TransformChain] {
        &self.variants
    }

    /// Process every annotation in the annotation directory.
    ///
    /// # Errors
    ///
    /// Only setup failures (output directories, listing the annotation
    /// directory) abort the run. Per-item failures are returned in the
    /// report.
    pub fn run(&self) -> Result<BatchReport, BatchError> {
        for dir in [&self.config.output_image_dir, &self.config.output_annotation_dir] {
            fs::create_dir_all(dir).map_err(|source| BatchError::Setup {
                path: dir.clone(),
                source,
            })?;
        }

        let annotations = self.list_annotations()?;
        info!(
            "Found {} annotation files in {}",
            annotations.len(),
            self.config.annotation_dir.display()
        );

        let outcomes: Vec<(PathBuf, Result<ItemReport, BatchError>)> = annotations
            .into_par_iter()
            .map(|path| {
                let outcome = self.process_one(&path);
                (path, outcome)
            })
            .collect();

        let mut report = BatchReport::default();
        for (annotation, outcome) in outcomes {
            match outcome {
                Ok(item) => report.succeeded.push(item),
                Err(error) => {
                    error!("{}: {}", annotation.display(), error);
                    report.failed.push(ItemFailure { annotation, error });
                }
            }
        }

        info!(
            "Augmented {} of {} annotations ({} outputs, {} failed)",
            report.succeeded.len(),
            report.total(),
            report.outputs_written(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Produce every variant of a single annotation record.
    pub fn process_one(&self, annotation_path: &Path) -> Result<ItemReport, BatchError> {
        info!("{}", annotation_path.display());

        let anno_stem = file_stem(annotation_path)?;
        let record = VocAnnotation::read_from(annotation_path).map_err(|source| {
            BatchError::Annotation {
                path: annotation_path.to_path_buf(),
                source,
            }
        })?;

        let image_path = self
            .config
            .image_dir
            .join(&record.folder)
            .join(&record.filename);
        let image = load_image(&image_path).map_err(|source| BatchError::Image {
            path: image_path.clone(),
            source,
        })?;

        let boxes = record.boxes();
        check_boxes(image.width, image.height, &boxes)?;

        let (image_stem, image_ext) = split_file_name(&record.filename);
        let output_folder = self.config.output_image_dir.join(&record.folder);
        for dir in [&output_folder, &self.config.output_annotation_dir] {
            fs::create_dir_all(dir).map_err(|source| BatchError::Setup {
                path: dir.clone(),
                source,
            })?;
        }

        let label = self.config.label_for(anno_stem);
        let mut outputs = Vec::with_capacity(self.variants.len());

        for (index, chain) in self.variants.iter().enumerate() {
            let augmented = chain.apply(&image, &boxes);

            let image_name = match image_ext {
                Some(ext) => format!("{image_stem}_{index}.{ext}"),
                None => format!("{image_stem}_{index}"),
            };
            let image_out = output_folder.join(&image_name);
            let anno_out = self
                .config
                .output_annotation_dir
                .join(format!("{anno_stem}_{index}.xml"));

            // Record first; it is removed again if the image cannot be saved.
            record
                .with_variant(&image_name, &augmented.image, &augmented.boxes, label.as_deref())
                .and_then(|updated| updated.write_to(&anno_out))
                .map_err(|source| BatchError::Annotation {
                    path: anno_out.clone(),
                    source,
                })?;

            if let Err(source) = save_image(&augmented.image, &image_out) {
                if let Err(e) = fs::remove_file(&anno_out) {
                    warn!("Could not remove {}: {}", anno_out.display(), e);
                }
                return Err(BatchError::Image {
                    path: image_out,
                    source,
                });
            }

            debug!("[{}] {} -> {}", index, chain, image_out.display());
            outputs.push(VariantOutput {
                index,
                image: image_out,
                annotation: anno_out,
            });
        }

        Ok(ItemReport {
            annotation: annotation_path.to_path_buf(),
            outputs,
        })
    }

    /// Sorted `*.xml` files directly inside the annotation directory.
    fn list_annotations(&self) -> Result<Vec<PathBuf>, BatchError> {
        let dir = &self.config.annotation_dir;
        let setup = |source| BatchError::Setup {
            path: dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(setup)? {
            let path = entry.map_err(setup)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                paths.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn file_stem(path: &Path) -> Result<&str, BatchError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BatchError::FileName(path.to_path_buf()))
}

/// Split `name.ext` at the last dot; a leading dot is part of the stem.
fn split_file_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
