//! Directory layout and labelling options for a batch run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::BatchError;

/// Where to read sources and write variants.
///
/// Images are looked up as `image_dir/<folder>/<filename>` using the
/// record's own folder and filename; outputs mirror that folder under
/// `output_image_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub image_dir: PathBuf,
    pub annotation_dir: PathBuf,
    pub output_image_dir: PathBuf,
    pub output_annotation_dir: PathBuf,
    /// Rename every object after the annotation's file-name prefix.
    ///
    /// Off by default, so source labels are kept. Turn it on to reproduce
    /// the `label_<class>` naming of datasets whose annotation files are
    /// named `<class>_<n>.xml`.
    pub relabel_from_file_stem: bool,
    /// Prepended to the file-name prefix when relabelling.
    pub label_prefix: String,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("images"),
            annotation_dir: PathBuf::from("annotation"),
            output_image_dir: PathBuf::from("output/images"),
            output_annotation_dir: PathBuf::from("output/annotation"),
            relabel_from_file_stem: false,
            label_prefix: "label_".to_string(),
        }
    }
}

impl AugmentConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::Config(e.to_string()))
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, BatchError> {
        let json = std::fs::read_to_string(path).map_err(|source| BatchError::Setup {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Label for objects of the annotation named `stem`, if relabelling.
    ///
    /// `"cat_0012"` becomes `"{label_prefix}cat"`.
    pub fn label_for(&self, stem: &str) -> Option<String> {
        if !self.relabel_from_file_stem {
            return None;
        }
        let class = stem.split_once('_').map_or(stem, |(head, _)| head);
        Some(format!("{}{}", self.label_prefix, class))
    }
}
