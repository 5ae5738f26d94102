use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command::ToolCommand;
use crate::consts::{MOSAIC_SUFFIX, PLACEMENT_ORIGIN};
use crate::error::Result;
use crate::pipeline::Stage;
use crate::registry::UnitRegistry;
use crate::report::PairOffset;
use crate::stage::{verify_outputs, StageContext};

/// Registration offsets keyed by the lower CCD id of each adjacent pair, so
/// the entry for `i` describes the pair `(i, i + 1)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OffsetTable {
    offsets: BTreeMap<u32, PairOffset>,
}

impl OffsetTable {
    pub fn insert(&mut self, lower: u32, offset: PairOffset) {
        self.offsets.insert(lower, offset);
    }

    pub fn get(&self, lower: u32) -> Option<PairOffset> {
        self.offsets.get(&lower).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, PairOffset)> + '_ {
        self.offsets.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(u32, PairOffset)> for OffsetTable {
    fn from_iter<I: IntoIterator<Item = (u32, PairOffset)>>(iter: I) -> Self {
        Self {
            offsets: iter.into_iter().collect(),
        }
    }
}

/// Where one CCD is laid into the mosaic, in 1-based pixel coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub ccd: u32,
    pub source: PathBuf,
    pub sample: i64,
    pub line: i64,
}

/// Round half to even, then truncate to a pixel coordinate.
fn to_pixel(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Compute where every non-reference CCD goes.
///
/// Two passes walk outward from the reference. Below it, offsets are added
/// from `reference - 1` down to the lowest id; above it, the accumulators
/// restart and offsets of the pair below each CCD are subtracted, up to the
/// highest id. Absent CCDs are skipped without resetting the accumulators, as
/// are CCDs with no registered offset. Placements are returned in the order
/// they must be applied.
pub fn plan_placements(registry: &UnitRegistry, offsets: &OffsetTable) -> Result<Vec<Placement>> {
    let reference = registry.reference_id();
    let min = registry.min_id()?;
    let max = registry.max_id()?;
    let mut placements = Vec::with_capacity(registry.len().saturating_sub(1));

    let mut sample_sum = PLACEMENT_ORIGIN;
    let mut line_sum = PLACEMENT_ORIGIN;
    for ccd in (min..reference).rev() {
        let Some(source) = registry.get(ccd) else {
            continue;
        };
        let Some(offset) = offsets.get(ccd) else {
            warn!(ccd, "No registration offset for CCD {ccd}, leaving it out of the mosaic");
            continue;
        };
        sample_sum += offset.sample;
        line_sum += offset.line;
        placements.push(Placement {
            ccd,
            source: source.to_path_buf(),
            sample: to_pixel(sample_sum),
            line: to_pixel(line_sum),
        });
    }

    let mut sample_sum = PLACEMENT_ORIGIN;
    let mut line_sum = PLACEMENT_ORIGIN;
    for ccd in reference.saturating_add(1)..=max {
        let Some(source) = registry.get(ccd) else {
            continue;
        };
        let Some(offset) = offsets.get(ccd - 1) else {
            warn!(ccd, "No registration offset for CCD {ccd}, leaving it out of the mosaic");
            continue;
        };
        sample_sum -= offset.sample;
        line_sum -= offset.line;
        placements.push(Placement {
            ccd,
            source: source.to_path_buf(),
            sample: to_pixel(sample_sum),
            line: to_pixel(line_sum),
        });
    }

    Ok(placements)
}

/// The raw mosaic canvas for a registry: `<prefix>.mos_hijitreged.cub`.
pub fn mosaic_path(registry: &UnitRegistry) -> PathBuf {
    PathBuf::from(format!("{}{MOSAIC_SUFFIX}", registry.prefix()))
}

/// Build the mosaic canvas.
///
/// The canvas starts as a copy of the reference CCD; every placement is then
/// laid beneath the existing content, one `handmos` at a time, so CCDs closer
/// to the reference win in overlaps.
pub fn compose_mosaic(
    ctx: &StageContext,
    registry: &UnitRegistry,
    offsets: &OffsetTable,
) -> Result<PathBuf> {
    let reference = registry.reference_filename()?;
    let placements = plan_placements(registry, offsets)?;
    let canvas = mosaic_path(registry);
    fs::copy(reference, &canvas)?;
    info!(
        canvas = %canvas.display(),
        reference = %reference.display(),
        "Seeded mosaic canvas"
    );

    let reporter = ctx.reporter();
    reporter.begin_stage(Stage::Mosaicking, Some(placements.len()));
    let mut pool = ctx.serial_pool();
    for (done, placement) in placements.iter().enumerate() {
        pool.submit(placement_command(ctx, placement, &canvas));
        reporter.advance(done + 1);
    }
    pool.drain_all();
    reporter.finish_stage();

    verify_outputs(Stage::Mosaicking, std::slice::from_ref(&canvas))?;
    Ok(canvas)
}

fn placement_command(ctx: &StageContext, placement: &Placement, canvas: &Path) -> ToolCommand {
    ctx.tool(Stage::Mosaicking)
        .path_param("from", &placement.source)
        .path_param("mosaic", canvas)
        .param("outsample", placement.sample.to_string())
        .param("outline", placement.line.to_string())
        .param("priority", "beneath")
}
