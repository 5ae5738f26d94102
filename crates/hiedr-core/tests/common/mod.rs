use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hiedr_core::command::ToolCommand;
use hiedr_core::error::Result;
use hiedr_core::executor::{Executor, RunningTask, TaskOutcome};
use hiedr_core::pipeline::config::PipelineConfig;
use hiedr_core::pipeline::ProgressReporter;
use hiedr_core::stage::StageContext;

/// Observation ID used for synthetic file names.
pub const OBSERVATION: &str = "ESP_011277_1825";

#[derive(Default)]
struct FakeState {
    launched: Vec<ToolCommand>,
    live: usize,
    peak: usize,
}

/// Executor that simulates the image tools instead of spawning them.
///
/// A simulated tool "runs" when it is waited on: it writes the file named by
/// its `to=` parameter (or the report named by `flatfile=`), and `handmos`
/// appends a line describing the placement to the mosaic canvas.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<FakeState>>,
    failing: Arc<HashSet<String>>,
    reports: Arc<HashMap<String, String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools in `programs` exit non-zero and produce nothing.
    pub fn failing(programs: &[&str]) -> Self {
        Self {
            failing: Arc::new(programs.iter().map(|p| p.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Registration reports written for the given `flat_<i>_<j>.txt` names.
    pub fn with_reports(mut self, reports: &[(&str, &str)]) -> Self {
        self.reports = Arc::new(
            reports
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        );
        self
    }

    pub fn launched(&self) -> Vec<ToolCommand> {
        self.state.lock().unwrap().launched.clone()
    }

    /// Launched commands whose program is `tool`.
    pub fn launched_tool(&self, tool: &str) -> Vec<ToolCommand> {
        self.launched()
            .into_iter()
            .filter(|c| program_name(c) == tool)
            .collect()
    }

    pub fn peak(&self) -> usize {
        self.state.lock().unwrap().peak
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }
}

fn program_name(command: &ToolCommand) -> String {
    Path::new(&command.program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn param(command: &ToolCommand, key: &str) -> Option<PathBuf> {
    command.value_of(key).map(PathBuf::from)
}

impl Executor for FakeExecutor {
    fn launch(&self, command: &ToolCommand) -> Result<Box<dyn RunningTask>> {
        let mut state = self.state.lock().unwrap();
        state.launched.push(command.clone());
        state.live += 1;
        state.peak = state.peak.max(state.live);
        Ok(Box::new(FakeTask {
            command: command.clone(),
            state: self.state.clone(),
            failing: self.failing.clone(),
            reports: self.reports.clone(),
        }))
    }
}

struct FakeTask {
    command: ToolCommand,
    state: Arc<Mutex<FakeState>>,
    failing: Arc<HashSet<String>>,
    reports: Arc<HashMap<String, String>>,
}

impl RunningTask for FakeTask {
    fn wait(&mut self) -> Result<TaskOutcome> {
        self.state.lock().unwrap().live -= 1;
        let program = program_name(&self.command);
        if self.failing.contains(&program) {
            return Ok(TaskOutcome::Failed(Some(1)));
        }

        match program.as_str() {
            "hijitreg" => {
                let flat = param(&self.command, "flatfile").expect("flatfile param");
                let name = flat.file_name().unwrap().to_string_lossy().into_owned();
                let text = self
                    .reports
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| report_text(1.0, 1.0));
                fs::write(&flat, text)?;
            }
            "handmos" => {
                let canvas = param(&self.command, "mosaic").expect("mosaic param");
                let from = param(&self.command, "from").expect("from param");
                let sample = self.command.value_of("outsample").unwrap().to_string_lossy().into_owned();
                let line = self.command.value_of("outline").unwrap().to_string_lossy().into_owned();
                let mut f = OpenOptions::new().append(true).open(&canvas)?;
                writeln!(f, "placed {} at {sample},{line}", from.display())?;
            }
            _ => {
                if let Some(to) = param(&self.command, "to") {
                    fs::write(&to, format!("{}\n", self.command))?;
                }
            }
        }
        Ok(TaskOutcome::Succeeded)
    }
}

/// Registration report text in the format the registration tool writes.
pub fn report_text(sample: f64, line: f64) -> String {
    format!(
        "# Jitter registration\n\
         #     Total Registers: 120 of 120\n\
         #  Average Sample Offset: {sample}  StdDev: 0.1152\n\
         #    Average Line Offset: {line}  StdDev: 0.2231\n"
    )
}

/// Create empty raw channel files for every `(ccd, channel)` in `dir`.
pub fn write_raw_channels(dir: &Path, channels: &[(u32, u32)]) -> Vec<PathBuf> {
    channels
        .iter()
        .map(|(ccd, channel)| {
            let path = dir.join(format!("{OBSERVATION}_RED{ccd}_{channel}.IMG"));
            fs::write(&path, b"raw").unwrap();
            path
        })
        .collect()
}

/// Both channels of every CCD in `ccds`.
pub fn both_channels(ccds: std::ops::RangeInclusive<u32>) -> Vec<(u32, u32)> {
    ccds.flat_map(|c| [(c, 0), (c, 1)]).collect()
}

/// Create one file per CCD named `<dir>/<OBSERVATION>_RED<ccd><suffix>`.
pub fn write_ccd_files(dir: &Path, ccds: &[u32], suffix: &str) -> Vec<PathBuf> {
    ccds.iter()
        .map(|ccd| {
            let path = dir.join(format!("{OBSERVATION}_RED{ccd}{suffix}"));
            fs::write(&path, format!("ccd {ccd}\n")).unwrap();
            path
        })
        .collect()
}

/// Config writing everything into `dir`.
pub fn config_in(dir: &Path, inputs: Vec<PathBuf>) -> PipelineConfig {
    PipelineConfig {
        inputs,
        output_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

pub struct NoProgress;
impl ProgressReporter for NoProgress {}

pub fn context(config: &PipelineConfig, executor: &FakeExecutor) -> StageContext {
    StageContext::new(config, Arc::new(executor.clone()), Arc::new(NoProgress))
}
