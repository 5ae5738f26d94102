use std::sync::Mutex;

use hiedr_core::pipeline::{ProgressReporter, Stage};
use indicatif::{ProgressBar, ProgressStyle};

/// One progress bar per stage, counting dispatched tool invocations.
#[derive(Default)]
pub struct IndicatifReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter for IndicatifReporter {
    fn begin_stage(&self, stage: Stage, total_items: Option<usize>) {
        let pb = match total_items {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{msg:22} [{bar:40}] {pos}/{len}")
                {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };
        pb.set_message(stage.to_string());

        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(pb) {
            previous.finish();
        }
    }

    fn advance(&self, items_done: usize) {
        let slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref pb) = *slot {
            pb.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = slot.take() {
            pb.finish();
        }
    }
}
