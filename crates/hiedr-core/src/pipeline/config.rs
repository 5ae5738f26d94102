use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_IMAGE_TYPE, DEFAULT_REFERENCE_CCD, DEFAULT_THREADS};
use crate::error::{MosaicError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Raw channel files, or stitched CCD files when resuming.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    /// Directory that receives converted cubes, reports and scratch space.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Maximum number of tools running at once.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// CCD every other CCD is placed relative to.
    #[serde(default = "default_reference_ccd")]
    pub reference_ccd: u32,
    #[serde(default)]
    pub keep_intermediates: bool,
    /// Let `spiceinit` fetch kernels from the network.
    #[serde(default)]
    pub web_kernels: bool,
    #[serde(default)]
    pub checkpoint: Checkpoint,
    /// Fetch the inputs from a remote index page first.
    #[serde(default)]
    pub download: Option<DownloadConfig>,
    /// Directory holding the image tools. Uses `PATH` when unset.
    #[serde(default)]
    pub tool_dir: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_reference_ccd() -> u32 {
    DEFAULT_REFERENCE_CCD
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output_dir: default_output_dir(),
            threads: DEFAULT_THREADS,
            reference_ccd: DEFAULT_REFERENCE_CCD,
            keep_intermediates: false,
            web_kernels: false,
            checkpoint: Checkpoint::default(),
            download: None,
            tool_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(MosaicError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        if self.reference_ccd > 9 {
            return Err(MosaicError::InvalidConfig(format!(
                "reference CCD must be a single digit, got {}",
                self.reference_ccd
            )));
        }
        if self.inputs.is_empty() && self.download.is_none() {
            return Err(MosaicError::InvalidConfig(
                "need channel files or a URL".into(),
            ));
        }
        if self.download.is_some() && self.checkpoint == Checkpoint::ResumeAtNoProj {
            return Err(MosaicError::InvalidConfig(
                "cannot resume from downloaded raw channel files".into(),
            ));
        }
        Ok(())
    }
}

/// Partial-run checkpoints around geometry correction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Checkpoint {
    /// Run every stage.
    #[default]
    Full,
    /// Stop once SPICE is attached, so the camera can be adjusted externally.
    StopBeforeNoProj,
    /// Treat the inputs as stitched, SPICE-attached CCD files and continue
    /// from geometry correction.
    ResumeAtNoProj,
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "Full run"),
            Self::StopBeforeNoProj => write!(f, "Stop before noproj"),
            Self::ResumeAtNoProj => write!(f, "Resume at noproj"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Index page listing the channel files.
    pub url: String,
    /// Local folder the files are downloaded into.
    pub folder: PathBuf,
    /// Only links whose text contains this are fetched.
    #[serde(default = "default_image_type")]
    pub image_type: String,
}

fn default_image_type() -> String {
    DEFAULT_IMAGE_TYPE.to_string()
}
