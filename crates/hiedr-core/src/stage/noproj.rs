use std::path::{self, Path, PathBuf};

use crate::consts::SCRATCH_DIR_PREFIX;
use crate::error::Result;
use crate::pipeline::Stage;
use crate::registry::UnitRegistry;

use super::{prefixed, StageContext, StageJob};

impl StageContext {
    /// `noproj` jobs matching every CCD to the reference CCD's camera, writing
    /// `<prefix><ccd>.noproj.cub`.
    ///
    /// Each tool runs in its own scratch directory so the print files it
    /// leaves behind never collide; paths are made absolute for that reason.
    pub fn plan_geometry_correction(&self, registry: &UnitRegistry) -> Result<Vec<StageJob>> {
        let reference = path::absolute(registry.reference_filename()?)?;
        let mut jobs = Vec::with_capacity(registry.len());
        for (ccd, cub) in registry.iter() {
            let to = prefixed(registry.prefix(), &format!("{ccd}.noproj.cub"));
            let command = self
                .tool(Stage::GeometryCorrection)
                .path_param("from", &path::absolute(cub)?)
                .path_param("match", &reference)
                .param("source", "frommatch")
                .path_param("to", &path::absolute(&to)?)
                .in_scratch_dir(path::absolute(self.scratch_dir_for(cub))?);
            jobs.push(StageJob::producing(to, command));
        }
        Ok(jobs)
    }

    /// Remove camera distortions from every CCD. Returns the registry of the
    /// corrected cubes, which supersedes `registry`.
    pub fn correct_geometry(&self, registry: &UnitRegistry) -> Result<UnitRegistry> {
        let jobs = self.plan_geometry_correction(registry)?;
        let summary = self.run_wave(Stage::GeometryCorrection, jobs)?;
        let inputs: Vec<&Path> = registry.iter().map(|(_, p)| p).collect();
        self.remove_intermediates(&inputs)?;
        UnitRegistry::build(&summary.outputs, registry.reference_id())
    }

    fn scratch_dir_for(&self, cub: &Path) -> PathBuf {
        let name = cub
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir()
            .join(format!("{SCRATCH_DIR_PREFIX}{name}"))
    }
}
