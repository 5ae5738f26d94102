use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use tracing::{debug, warn};

use crate::command::ToolCommand;
use crate::error::Result;

/// How a launched tool finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    /// Non-zero exit. `None` when the process was terminated by a signal.
    Failed(Option<i32>),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A launched tool that has not yet been waited on.
pub trait RunningTask: Send {
    /// Block until the tool exits.
    fn wait(&mut self) -> Result<TaskOutcome>;
}

/// Launches external tools asynchronously.
///
/// Production code uses [`ProcessExecutor`]; tests substitute executors that
/// simulate tools without spawning processes.
pub trait Executor: Send + Sync {
    fn launch(&self, command: &ToolCommand) -> Result<Box<dyn RunningTask>>;
}

/// Runs every tool as a child OS process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn launch(&self, command: &ToolCommand) -> Result<Box<dyn RunningTask>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(command.os_args());
        if let Some(ref dir) = command.scratch_dir {
            fs::create_dir_all(dir)?;
            cmd.current_dir(dir);
        }
        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                if let Some(ref dir) = command.scratch_dir {
                    remove_scratch(dir);
                }
                return Err(e.into());
            }
        };
        debug!(pid = child.id(), program = %command.program, "Launched tool");
        Ok(Box::new(ChildTask {
            child,
            scratch_dir: command.scratch_dir.clone(),
        }))
    }
}

struct ChildTask {
    child: Child,
    scratch_dir: Option<PathBuf>,
}

impl RunningTask for ChildTask {
    fn wait(&mut self) -> Result<TaskOutcome> {
        let status = self.child.wait();
        if let Some(dir) = self.scratch_dir.take() {
            remove_scratch(&dir);
        }
        let status = status?;
        if status.success() {
            Ok(TaskOutcome::Succeeded)
        } else {
            Ok(TaskOutcome::Failed(status.code()))
        }
    }
}

fn remove_scratch(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "Could not remove scratch directory");
    }
}
