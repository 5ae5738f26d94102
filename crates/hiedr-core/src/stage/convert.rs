use std::path::{Path, PathBuf};

use crate::error::{MosaicError, Result};
use crate::pipeline::Stage;

use super::{StageContext, StageJob};

impl StageContext {
    /// `hi2isis` job for one raw channel file. The cube lands in the output
    /// directory as `<stem>.cub`.
    pub fn plan_conversion(&self, image: &Path) -> Result<StageJob> {
        let stem = image
            .file_stem()
            .ok_or_else(|| MosaicError::MalformedFilename(image.display().to_string()))?;
        let mut name = stem.to_os_string();
        name.push(".cub");
        let to = self.output_dir().join(name);
        let command = self
            .tool(Stage::Conversion)
            .path_param("from", image)
            .path_param("to", &to);
        Ok(StageJob::producing(to, command))
    }

    /// Convert raw channel files to cubes. Raw inputs are never deleted.
    pub fn convert(&self, images: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let jobs = images
            .iter()
            .map(|img| self.plan_conversion(img))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.run_wave(Stage::Conversion, jobs)?.outputs)
    }
}
