use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not extract a CCD identifier from {0}")]
    MalformedFilename(String),

    #[error("CCD {id} is claimed by both {first} and {second}")]
    DuplicateUnit {
        id: u32,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("No CCD files to process")]
    EmptyRegistry,

    #[error("Reference CCD {0} is not among the input files")]
    MissingReferenceUnit(u32),

    #[error("Found {found} files for match CCD {ccd} instead of 2")]
    ReferenceChannelCount { ccd: u32, found: usize },

    #[error("{stage} failed to generate: {}", display_paths(.missing))]
    StageOutputMissing { stage: Stage, missing: Vec<PathBuf> },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, MosaicError>;
