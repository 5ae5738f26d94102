/// CCD used as the placement reference when none is configured.
pub const DEFAULT_REFERENCE_CCD: u32 = 5;

/// Default number of external tools allowed to run at once.
pub const DEFAULT_THREADS: usize = 4;

/// Number of raw channel files expected for every CCD, including the reference.
pub const CHANNELS_PER_CCD: usize = 2;

/// Image type filter applied to remote index listings.
pub const DEFAULT_IMAGE_TYPE: &str = "RED";

/// Starting value of both placement accumulators. Mosaic coordinates are 1-based.
pub const PLACEMENT_ORIGIN: f64 = 1.0;

/// Label of the horizontal offset line in a registration report.
pub const SAMPLE_OFFSET_LABEL: &str = "Average Sample Offset:";

/// Label of the vertical offset line in a registration report.
pub const LINE_OFFSET_LABEL: &str = "Average Line Offset:";

/// Marker that starts the value in either offset line.
pub const OFFSET_MARKER: &str = "Offset:";

/// Marker that terminates the value in either offset line.
pub const STDDEV_MARKER: &str = "StdDev:";

/// Suffix appended to the registry prefix to name the raw mosaic canvas.
pub const MOSAIC_SUFFIX: &str = ".mos_hijitreged.cub";

/// Prefix of the per-unit scratch directory geometry correction runs in.
pub const SCRATCH_DIR_PREFIX: &str = "tmp_";
