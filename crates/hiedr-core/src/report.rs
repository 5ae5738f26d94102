use std::fmt;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::consts::{LINE_OFFSET_LABEL, OFFSET_MARKER, SAMPLE_OFFSET_LABEL, STDDEV_MARKER};

/// Average registration offset between two adjacent CCDs, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairOffset {
    /// Horizontal offset.
    pub sample: f64,
    /// Vertical offset.
    pub line: f64,
}

impl PairOffset {
    pub fn new(sample: f64, line: f64) -> Self {
        Self { sample, line }
    }
}

impl fmt::Display for PairOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample {:+.4}, line {:+.4}", self.sample, self.line)
    }
}

/// What a report says about one offset field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldReading {
    Missing,
    /// The labeled line was present but its value did not parse.
    Invalid(String),
    Value(f64),
}

impl FieldReading {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not found"),
            Self::Invalid(raw) => write!(f, "unparsable ({raw:?})"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Both offset fields of a registration report, as written.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportFields {
    pub sample: FieldReading,
    pub line: FieldReading,
}

impl ReportFields {
    /// The offset, if both fields parsed.
    pub fn offset(&self) -> Option<PairOffset> {
        Some(PairOffset::new(self.sample.value()?, self.line.value()?))
    }
}

/// Read the two labeled offset lines out of registration report text.
///
/// The value of each line is the text between the last `Offset:` and the last
/// `StdDev:`. When a label appears more than once the last line wins.
pub fn parse_report(text: &str) -> ReportFields {
    let mut sample = FieldReading::Missing;
    let mut line_offset = FieldReading::Missing;
    for line in text.lines() {
        if line.contains(SAMPLE_OFFSET_LABEL) {
            sample = read_value(line);
        } else if line.contains(LINE_OFFSET_LABEL) {
            line_offset = read_value(line);
        }
    }
    ReportFields {
        sample,
        line: line_offset,
    }
}

fn read_value(line: &str) -> FieldReading {
    let (Some(start), Some(end)) = (line.rfind(OFFSET_MARKER), line.rfind(STDDEV_MARKER)) else {
        return FieldReading::Invalid(line.trim().to_string());
    };
    let start = start + OFFSET_MARKER.len();
    if end < start {
        return FieldReading::Invalid(line.trim().to_string());
    }
    let raw = line[start..end].trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldReading::Value(v),
        _ => FieldReading::Invalid(raw.to_string()),
    }
}

/// Offsets recovered from a report, plus the warning issued if any field had
/// to fall back to zero.
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetExtraction {
    pub offset: PairOffset,
    pub warning: Option<String>,
}

/// Recover the average offsets from a registration report.
///
/// Never fails. A field that is missing or unparsable, or a report that
/// cannot be read, yields `0.0` for that field and a logged warning naming the
/// report. The CCDs may then be misaligned, but the mosaic still completes.
pub fn extract_offsets(report: &Path) -> OffsetExtraction {
    let fields = match fs::read_to_string(report) {
        Ok(text) => parse_report(&text),
        Err(e) => {
            let warning = format!(
                "Could not read the registration report {} ({e}). \
                 Using zero offsets, which may misalign the CCDs.",
                report.display()
            );
            warn!(report = %report.display(), "{warning}");
            return OffsetExtraction {
                offset: PairOffset::default(),
                warning: Some(warning),
            };
        }
    };

    let offset = PairOffset::new(
        fields.sample.value().unwrap_or(0.0),
        fields.line.value().unwrap_or(0.0),
    );
    let warning = if fields.offset().is_some() {
        None
    } else {
        let warning = format!(
            "Could not extract valid offsets from the report {} \
             (sample offset {}, line offset {}). This can happen when no \
             matches were found; the registration may need a custom \
             definition. Using zero for the missing offsets, which may \
             misalign the CCDs.",
            report.display(),
            fields.sample,
            fields.line
        );
        warn!(report = %report.display(), "{warning}");
        Some(warning)
    };

    OffsetExtraction { offset, warning }
}
