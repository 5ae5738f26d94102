use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::command::ToolCommand;
use crate::executor::{Executor, RunningTask, TaskOutcome};

/// Tally of one wave of tool invocations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveReport {
    pub submitted: usize,
    pub succeeded: usize,
    /// Non-zero exits, launch failures and tasks that could not be waited on.
    pub failed: usize,
}

struct Tracked {
    label: String,
    task: Box<dyn RunningTask>,
}

/// Bounded pool of running external tools.
///
/// At most `capacity` tasks are tracked at once. Tasks are retired strictly in
/// submission order: when the pool is full, [`JobPool::submit`] blocks on the
/// oldest task before launching the new one. Exit statuses are tallied and
/// logged but never stop the wave; callers verify outputs after
/// [`JobPool::drain_all`].
///
/// A pool represents one wave. Dropping it waits for everything still running.
pub struct JobPool {
    executor: Arc<dyn Executor>,
    // Ring of `capacity` slots; live entries are `head..head + len` (mod capacity).
    slots: Vec<Option<Tracked>>,
    head: usize,
    len: usize,
    peak: usize,
    report: WaveReport,
}

impl JobPool {
    /// Create a pool. A `capacity` of zero is treated as one.
    pub fn new(executor: Arc<dyn Executor>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            executor,
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            peak: 0,
            report: WaveReport::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of tasks currently tracked as running.
    pub fn running(&self) -> usize {
        self.len
    }

    /// Highest number of tasks tracked at once during this wave.
    pub fn peak_running(&self) -> usize {
        self.peak
    }

    pub fn report(&self) -> WaveReport {
        self.report
    }

    /// Launch `command`, first retiring the oldest task if the pool is full.
    pub fn submit(&mut self, command: ToolCommand) {
        if self.len >= self.capacity() {
            self.retire_oldest();
        }

        info!(command = %command, "Running");
        self.report.submitted += 1;
        match self.executor.launch(&command) {
            Ok(task) => {
                let tail = (self.head + self.len) % self.capacity();
                self.slots[tail] = Some(Tracked {
                    label: command.program.clone(),
                    task,
                });
                self.len += 1;
                self.peak = self.peak.max(self.len);
            }
            Err(e) => {
                warn!(program = %command.program, error = %e, "Failed to launch tool");
                self.report.failed += 1;
            }
        }
    }

    /// Block until every tracked task has finished. The pool is empty afterwards.
    pub fn drain_all(&mut self) -> WaveReport {
        if self.len > 0 {
            info!(running = self.len, "Waiting for jobs to finish");
        }
        while self.len > 0 {
            self.retire_oldest();
        }
        debug!(report = ?self.report, "Wave drained");
        self.report
    }

    fn retire_oldest(&mut self) {
        let slot = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        let Some(mut tracked) = slot else {
            return;
        };

        match tracked.task.wait() {
            Ok(TaskOutcome::Succeeded) => self.report.succeeded += 1,
            Ok(TaskOutcome::Failed(code)) => {
                warn!(program = %tracked.label, ?code, "Tool exited with failure");
                self.report.failed += 1;
            }
            Err(e) => {
                warn!(program = %tracked.label, error = %e, "Could not wait on tool");
                self.report.failed += 1;
            }
        }
    }
}

impl Drop for JobPool {
    fn drop(&mut self) {
        while self.len > 0 {
            self.retire_oldest();
        }
    }
}
