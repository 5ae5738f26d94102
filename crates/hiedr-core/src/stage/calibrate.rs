use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;

use crate::error::Result;
use crate::pipeline::Stage;
use crate::registry::common_prefix;

use super::{remove_file_if_present, with_suffix, StageContext, StageJob};

impl StageContext {
    /// `hical` job for one cube, writing `<cube without extension>.hical.cub`.
    pub fn plan_calibration(&self, cube: &Path) -> StageJob {
        let to = with_suffix(cube, "hical.cub");
        let command = self
            .tool(Stage::Calibration)
            .path_param("from", cube)
            .path_param("to", &to);
        StageJob::producing(to, command)
    }

    /// Radiometrically calibrate every cube.
    ///
    /// When intermediates are not kept, the input cubes and the calibration
    /// logs (`<prefix>*.hical.log`) are removed afterwards.
    pub fn calibrate(&self, cubes: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let jobs = cubes.iter().map(|c| self.plan_calibration(c)).collect();
        let summary = self.run_wave(Stage::Calibration, jobs)?;

        if !self.keep_intermediates() {
            self.remove_intermediates(cubes)?;
            for log in calibration_logs(cubes) {
                remove_file_if_present(&log)?;
            }
        }
        Ok(summary.outputs)
    }
}

fn calibration_logs(cubes: &[PathBuf]) -> Vec<PathBuf> {
    let names: Vec<String> = cubes
        .iter()
        .map(|c| c.to_string_lossy().into_owned())
        .collect();
    if names.is_empty() {
        return Vec::new();
    }
    let pattern = format!("{}*.hical.log", Pattern::escape(&common_prefix(&names)));
    match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
        Err(e) => {
            warn!(%pattern, error = %e, "Could not search for calibration logs");
            Vec::new()
        }
    }
}
