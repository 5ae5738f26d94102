use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::pipeline::Stage;

use super::{with_suffix, StageContext, StageJob};

fn normalized_path(mosaic: &Path) -> PathBuf {
    with_suffix(mosaic, "norm.cub")
}

impl StageContext {
    pub fn plan_normalization(&self, mosaic: &Path) -> StageJob {
        let to = normalized_path(mosaic);
        let command = self
            .tool(Stage::Normalization)
            .path_param("from", mosaic)
            .path_param("to", &to);
        StageJob::producing(to, command)
    }

    /// Run `cubenorm` over the finished mosaic, returning the normalized file.
    pub fn normalize(&self, mosaic: &Path) -> Result<PathBuf> {
        let job = self.plan_normalization(mosaic);
        self.run_wave(Stage::Normalization, vec![job])?;
        self.remove_intermediates(&[mosaic])?;
        Ok(normalized_path(mosaic))
    }
}
