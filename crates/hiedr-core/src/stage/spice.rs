use std::path::PathBuf;

use crate::error::Result;
use crate::pipeline::Stage;

use super::{StageContext, StageJob};

impl StageContext {
    /// Attach SPICE to every stitched cube: one `spiceinit` wave, then one
    /// `spicefit` wave. Both tools update the cubes in place.
    pub fn attach_spice(&self, cubes: &[PathBuf]) -> Result<()> {
        let web = if self.web_kernels { "TRUE" } else { "FALSE" };
        let init = cubes
            .iter()
            .map(|cub| {
                StageJob::in_place(
                    self.tool(Stage::SpiceInit)
                        .param("web", web)
                        .path_param("from", cub),
                )
            })
            .collect();
        self.run_wave(Stage::SpiceInit, init)?;

        let fit = cubes
            .iter()
            .map(|cub| StageJob::in_place(self.tool(Stage::SpiceFit).path_param("from", cub)))
            .collect();
        self.run_wave(Stage::SpiceFit, fit)?;
        Ok(())
    }
}
