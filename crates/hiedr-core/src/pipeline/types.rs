use std::path::PathBuf;

/// Pipeline processing stage, used for logging, errors and progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Conversion,
    Calibration,
    Stitching,
    SpiceInit,
    SpiceFit,
    GeometryCorrection,
    Registration,
    Mosaicking,
    Normalization,
}

impl Stage {
    /// External program run by this stage.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Conversion => "hi2isis",
            Self::Calibration => "hical",
            Self::Stitching => "histitch",
            Self::SpiceInit => "spiceinit",
            Self::SpiceFit => "spicefit",
            Self::GeometryCorrection => "noproj",
            Self::Registration => "hijitreg",
            Self::Mosaicking => "handmos",
            Self::Normalization => "cubenorm",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversion => write!(f, "Converting to ISIS"),
            Self::Calibration => write!(f, "Calibrating"),
            Self::Stitching => write!(f, "Stitching channels"),
            Self::SpiceInit => write!(f, "Attaching SPICE"),
            Self::SpiceFit => write!(f, "Fitting SPICE"),
            Self::GeometryCorrection => write!(f, "Removing distortion"),
            Self::Registration => write!(f, "Registering CCDs"),
            Self::Mosaicking => write!(f, "Mosaicking"),
            Self::Normalization => write!(f, "Normalizing"),
        }
    }
}

/// Where a pipeline run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineOutput {
    /// Stopped at the checkpoint before geometry correction. Holds the
    /// stitched, SPICE-attached CCD files to resume from.
    Checkpoint(Vec<PathBuf>),
    /// The normalized mosaic.
    Mosaic(PathBuf),
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars or logging. All methods
/// have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of tool
    /// invocations planned for it, if known.
    fn begin_stage(&self, _stage: Stage, _total_items: Option<usize>) {}

    /// `items_done` invocations of the current stage have been dispatched or
    /// skipped.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(crate) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
