use crate::error::Result;
use crate::mosaic::OffsetTable;
use crate::pipeline::Stage;
use crate::registry::UnitRegistry;
use crate::report::extract_offsets;

use super::{StageContext, StageJob};

impl StageContext {
    /// `hijitreg` jobs for every adjacent pair `(i, i + 1)` present in the
    /// registry, each writing its report to `flat_<i>_<i+1>.txt`.
    pub fn plan_registration(&self, registry: &UnitRegistry) -> Vec<(u32, StageJob)> {
        registry
            .adjacent_pairs()
            .into_iter()
            .filter_map(|(i, j)| {
                let from = registry.get(i)?;
                let with = registry.get(j)?;
                let report = self.output_dir().join(format!("flat_{i}_{j}.txt"));
                let command = self
                    .tool(Stage::Registration)
                    .path_param("from", from)
                    .path_param("match", with)
                    .path_param("flatfile", &report);
                Some((i, StageJob::producing(report, command)))
            })
            .collect()
    }

    /// Register adjacent CCDs and read back their average offsets.
    ///
    /// Reports are always regenerated, and a missing or unparsable report
    /// degrades to a zero offset rather than failing the run.
    pub fn register(&self, registry: &UnitRegistry) -> Result<OffsetTable> {
        let planned = self.plan_registration(registry);
        self.reporter()
            .begin_stage(Stage::Registration, Some(planned.len()));
        let mut pool = self.pool();
        for (done, (_, job)) in planned.iter().enumerate() {
            pool.submit(job.command.clone());
            self.reporter().advance(done + 1);
        }
        pool.drain_all();
        self.reporter().finish_stage();

        let mut table = OffsetTable::default();
        for (lower, job) in &planned {
            let Some(report) = job.output.as_deref() else {
                continue;
            };
            table.insert(*lower, extract_offsets(report).offset);
            self.remove_intermediates(&[report])?;
        }
        Ok(table)
    }
}
