//! Per-stage planning and execution.
//!
//! Every stage follows the same wave discipline: plan one tool invocation per
//! input, skip invocations whose output already exists, run the rest through a
//! fresh [`JobPool`], wait for the whole wave, then verify that every expected
//! output exists before anything downstream looks at it.

mod calibrate;
mod convert;
mod noproj;
mod normalize;
mod register;
mod spice;
mod stitch;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::command::ToolCommand;
use crate::error::{MosaicError, Result};
use crate::executor::Executor;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::{ProgressReporter, Stage};
use crate::pool::{JobPool, WaveReport};

pub use stitch::{pair_channels, ChannelPairs, StitchPlan};

/// One planned tool invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct StageJob {
    /// File the tool is expected to produce. `None` for tools that update
    /// their input in place.
    pub output: Option<PathBuf>,
    pub command: ToolCommand,
}

impl StageJob {
    pub fn producing(output: PathBuf, command: ToolCommand) -> Self {
        Self {
            output: Some(output),
            command,
        }
    }

    pub fn in_place(command: ToolCommand) -> Self {
        Self {
            output: None,
            command,
        }
    }
}

/// Result of running one wave.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageSummary {
    pub wave: WaveReport,
    /// Jobs not submitted because their output already existed.
    pub skipped: usize,
    /// Expected outputs, in job order, all verified to exist.
    pub outputs: Vec<PathBuf>,
}

/// Shared state for running stages: the executor, the concurrency bound and
/// the cleanup policy. Passed explicitly to every stage.
pub struct StageContext {
    executor: Arc<dyn Executor>,
    reporter: Arc<dyn ProgressReporter>,
    threads: usize,
    output_dir: PathBuf,
    keep_intermediates: bool,
    web_kernels: bool,
    tool_dir: Option<PathBuf>,
}

impl StageContext {
    pub fn new(
        config: &PipelineConfig,
        executor: Arc<dyn Executor>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            executor,
            reporter,
            threads: config.threads.max(1),
            output_dir: config.output_dir.clone(),
            keep_intermediates: config.keep_intermediates,
            web_kernels: config.web_kernels,
            tool_dir: config.tool_dir.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn keep_intermediates(&self) -> bool {
        self.keep_intermediates
    }

    pub fn reporter(&self) -> &Arc<dyn ProgressReporter> {
        &self.reporter
    }

    /// A fresh pool for one wave, bounded by the configured thread count.
    pub fn pool(&self) -> JobPool {
        JobPool::new(self.executor.clone(), self.threads)
    }

    /// A pool that runs one tool at a time.
    pub fn serial_pool(&self) -> JobPool {
        JobPool::new(self.executor.clone(), 1)
    }

    /// Command for `stage`'s tool, resolved against the tool directory.
    pub fn tool(&self, stage: Stage) -> ToolCommand {
        ToolCommand::new(stage.tool()).resolved_in(self.tool_dir.as_deref())
    }

    /// Run `jobs` as one wave and verify their outputs.
    ///
    /// Jobs whose output already exists are skipped. Fails with
    /// [`MosaicError::StageOutputMissing`] if any expected output is absent
    /// once the wave has drained.
    pub fn run_wave(&self, stage: Stage, jobs: Vec<StageJob>) -> Result<StageSummary> {
        self.reporter.begin_stage(stage, Some(jobs.len()));
        let mut pool = self.pool();
        let mut outputs = Vec::new();
        let mut skipped = 0;

        for (i, job) in jobs.into_iter().enumerate() {
            if let Some(output) = job.output {
                if output.exists() {
                    info!(
                        output = %output.display(),
                        "{} exists, skipping {}",
                        output.display(),
                        stage.tool()
                    );
                    skipped += 1;
                    outputs.push(output);
                    self.reporter.advance(i + 1);
                    continue;
                }
                outputs.push(output);
            }
            pool.submit(job.command);
            self.reporter.advance(i + 1);
        }

        let wave = pool.drain_all();
        self.reporter.finish_stage();
        verify_outputs(stage, &outputs)?;
        debug!(%stage, submitted = wave.submitted, skipped, "Stage complete");

        Ok(StageSummary {
            wave,
            skipped,
            outputs,
        })
    }

    /// Delete `files` unless intermediates are kept. Already-missing files
    /// are ignored.
    pub fn remove_intermediates<P: AsRef<Path>>(&self, files: &[P]) -> Result<()> {
        if self.keep_intermediates {
            return Ok(());
        }
        for file in files {
            remove_file_if_present(file.as_ref())?;
        }
        Ok(())
    }
}

/// Fail with the list of `expected` files that do not exist.
pub fn verify_outputs(stage: Stage, expected: &[PathBuf]) -> Result<()> {
    let missing: Vec<PathBuf> = expected.iter().filter(|p| !p.exists()).cloned().collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MosaicError::StageOutputMissing { stage, missing })
    }
}

pub(crate) fn remove_file_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(file = %path.display(), "Removed intermediate");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// `path` with its final extension replaced by `suffix`, e.g. `a.cub` to
/// `a.hical.cub` for a suffix of `hical.cub`.
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    path.with_extension(suffix)
}

/// Prefix string followed by `tail`, as a path.
pub(crate) fn prefixed(prefix: &str, tail: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}{tail}"))
}
