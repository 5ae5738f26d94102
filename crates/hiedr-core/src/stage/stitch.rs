use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::consts::CHANNELS_PER_CCD;
use crate::error::{MosaicError, Result};
use crate::pipeline::Stage;
use crate::registry::anchored_prefix;

use super::{prefixed, StageContext, StageJob};

// Matched against the part of a name after the shared prefix: `<ccd>_<channel>`.
static RE_CCD_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d)_(\d)").expect("valid CCD/channel regex"));

/// Calibrated channel files grouped by CCD.
///
/// Names are expected to look like `<prefix><ccd>_<channel><suffix>`, with a
/// channel of 0 or 1.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelPairs {
    pub prefix: String,
    pub units: BTreeMap<u32, [Option<PathBuf>; CHANNELS_PER_CCD]>,
}

/// Group channel files by CCD.
///
/// A CCD with only one channel is kept with the other slot empty; CCDs with no
/// channels simply do not appear. A name without a `<ccd>_<channel>` marker
/// right after the shared prefix is an error.
pub fn pair_channels<P: AsRef<Path>>(files: &[P]) -> Result<ChannelPairs> {
    if files.is_empty() {
        return Ok(ChannelPairs::default());
    }
    let names: Vec<String> = files
        .iter()
        .map(|f| f.as_ref().to_string_lossy().into_owned())
        .collect();

    let prefix = anchored_prefix(&names, |rest| RE_CCD_CHANNEL.is_match(rest))
        .ok_or_else(|| {
            let offender = names.first().cloned().unwrap_or_default();
            MosaicError::MalformedFilename(offender)
        })?;

    let mut units: BTreeMap<u32, [Option<PathBuf>; CHANNELS_PER_CCD]> = BTreeMap::new();
    for (name, file) in names.iter().zip(files) {
        let caps = RE_CCD_CHANNEL
            .captures(&name[prefix.len()..])
            .ok_or_else(|| MosaicError::MalformedFilename(name.clone()))?;
        let ccd: u32 = caps[1]
            .parse()
            .map_err(|_| MosaicError::MalformedFilename(name.clone()))?;
        let channel: usize = caps[2]
            .parse()
            .map_err(|_| MosaicError::MalformedFilename(name.clone()))?;
        if channel >= CHANNELS_PER_CCD {
            return Err(MosaicError::MalformedFilename(name.clone()));
        }

        let slot = &mut units.entry(ccd).or_default()[channel];
        let path = file.as_ref().to_path_buf();
        if let Some(first) = slot.replace(path.clone()) {
            return Err(MosaicError::DuplicateUnit {
                id: ccd,
                first,
                second: path,
            });
        }
    }

    Ok(ChannelPairs { prefix, units })
}

/// One planned `histitch` invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct StitchPlan {
    pub job: StageJob,
    /// Channel files the job consumes.
    pub consumed: Vec<PathBuf>,
    /// Set, and logged, when only one channel of the CCD was found.
    pub warning: Option<String>,
}

impl StageContext {
    /// One `histitch` job per CCD that has at least one channel, writing
    /// `<prefix><ccd>.histitch.cub`.
    pub fn plan_stitching(&self, pairs: &ChannelPairs) -> Vec<StitchPlan> {
        let mut planned = Vec::new();
        for (ccd, channels) in &pairs.units {
            let to = prefixed(&pairs.prefix, &format!("{ccd}.histitch.cub"));
            let (command, consumed, warning) = match channels {
                [Some(first), Some(second)] => {
                    let command = self
                        .tool(Stage::Stitching)
                        .param("balance", "TRUE")
                        .path_param("from1", first)
                        .path_param("from2", second)
                        .path_param("to", &to);
                    (command, vec![first.clone(), second.clone()], None)
                }
                [Some(found), None] | [None, Some(found)] => {
                    let warning = format!(
                        "Found {} but not the matching channel file",
                        found.display()
                    );
                    warn!(ccd, file = %found.display(), "{warning}");
                    let command = self
                        .tool(Stage::Stitching)
                        .path_param("from1", found)
                        .path_param("to", &to);
                    (command, vec![found.clone()], Some(warning))
                }
                [None, None] => continue,
            };
            planned.push(StitchPlan {
                job: StageJob::producing(to, command),
                consumed,
                warning,
            });
        }
        planned
    }

    /// Combine the two channels of every CCD into one cube.
    pub fn stitch(&self, calibrated: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let pairs = pair_channels(calibrated)?;
        let mut jobs = Vec::new();
        let mut consumed = Vec::new();
        for plan in self.plan_stitching(&pairs) {
            jobs.push(plan.job);
            consumed.extend(plan.consumed);
        }
        let summary = self.run_wave(Stage::Stitching, jobs)?;
        self.remove_intermediates(&consumed)?;
        Ok(summary.outputs)
    }
}
