use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::download::{fetch_listing, ReqwestClient};
use crate::error::{MosaicError, Result};
use crate::executor::Executor;
use crate::mosaic::compose_mosaic;
use crate::registry::{check_reference_channels, UnitRegistry};
use crate::stage::StageContext;

use super::config::{Checkpoint, PipelineConfig};
use super::types::{NoOpReporter, PipelineOutput, ProgressReporter};

/// Inputs named by the config, downloading them first if a remote index is set.
fn resolve_inputs(config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let Some(ref download) = config.download else {
        return Ok(config.inputs.clone());
    };
    info!(url = %download.url, "Downloading images from URL");
    let client = ReqwestClient::new()?;
    let files = fetch_listing(
        &client,
        &download.url,
        &download.folder,
        &download.image_type,
    )?;
    info!(count = files.len(), "Finished downloading images");
    Ok(files)
}

/// Run the full pipeline with a thread-safe progress reporter.
///
/// Stages run in a fixed order, each as one barrier-terminated wave:
/// conversion, calibration, stitching, SPICE attachment, geometry correction,
/// registration, mosaicking and normalization. Any missing stage output stops
/// the run.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    executor: Arc<dyn Executor>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let inputs = resolve_inputs(config)?;
    if inputs.is_empty() {
        return Err(MosaicError::InvalidConfig("no input files found".into()));
    }

    let resuming = config.checkpoint == Checkpoint::ResumeAtNoProj;
    // Raw channel files only; resumed inputs are already stitched.
    if !resuming {
        check_reference_channels(&inputs, config.reference_ccd)?;
    }

    fs::create_dir_all(&config.output_dir)?;
    let ctx = StageContext::new(config, executor, reporter);
    info!(
        inputs = inputs.len(),
        threads = config.threads,
        reference = config.reference_ccd,
        "Starting pipeline"
    );

    let stitched = if resuming {
        inputs
    } else {
        let cubes = ctx.convert(&inputs)?;
        let calibrated = ctx.calibrate(&cubes)?;
        let stitched = ctx.stitch(&calibrated)?;
        ctx.attach_spice(&stitched)?;
        stitched
    };

    if config.checkpoint == Checkpoint::StopBeforeNoProj {
        info!(files = stitched.len(), "Stopped before noproj");
        return Ok(PipelineOutput::Checkpoint(stitched));
    }

    let registry = UnitRegistry::build(&stitched, config.reference_ccd)?;

    let projected = ctx.correct_geometry(&registry)?;
    let offsets = ctx.register(&projected)?;
    let mosaic = compose_mosaic(&ctx, &projected, &offsets)?;

    let projected_files: Vec<PathBuf> = projected.iter().map(|(_, p)| p.to_path_buf()).collect();
    ctx.remove_intermediates(&projected_files)?;

    let normalized = ctx.normalize(&mosaic)?;
    info!(output = %normalized.display(), "Finished");
    Ok(PipelineOutput::Mosaic(normalized))
}

/// Run the full pipeline without progress reporting.
pub fn run_pipeline(
    config: &PipelineConfig,
    executor: Arc<dyn Executor>,
) -> Result<PipelineOutput> {
    let reporter = Arc::new(NoOpReporter);
    run_pipeline_reported(config, executor, reporter)
}
