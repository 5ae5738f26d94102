use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory};
use hiedr_core::consts::{DEFAULT_IMAGE_TYPE, DEFAULT_REFERENCE_CCD, DEFAULT_THREADS};
use hiedr_core::executor::ProcessExecutor;
use hiedr_core::pipeline::config::{Checkpoint, DownloadConfig, PipelineConfig};
use hiedr_core::pipeline::{run_pipeline_reported, PipelineOutput};
use tracing::info;

use crate::progress::IndicatifReporter;
use crate::summary::print_run_summary;

#[derive(Args)]
pub struct RunArgs {
    /// Raw channel files (or stitched CCD files with --resume-at-no-proj).
    /// With --download-folder, a single URL of the observation's index page.
    pub inputs: Vec<String>,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of tools running at once
    #[arg(short, long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// CCD the others are matched to and placed relative to
    #[arg(short = 'm', long = "match", default_value_t = DEFAULT_REFERENCE_CCD)]
    pub reference_ccd: u32,

    /// Keep intermediate files
    #[arg(short, long)]
    pub keep: bool,

    /// Let spiceinit download kernels
    #[arg(short, long)]
    pub web: bool,

    /// Stop once SPICE is attached, before noproj
    #[arg(long, conflicts_with = "resume_at_no_proj")]
    pub stop_at_no_proj: bool,

    /// Start at noproj from stitched, SPICE-attached CCD files
    #[arg(long)]
    pub resume_at_no_proj: bool,

    /// Download the channel files listed at the URL into this folder first
    #[arg(long)]
    pub download_folder: Option<PathBuf>,

    /// Directory for cubes, reports and the mosaic
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Directory holding the ISIS tools (uses PATH if unset)
    #[arg(long)]
    pub tool_dir: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        let mut config: PipelineConfig =
            toml::from_str(&contents).context("Invalid pipeline config")?;
        info!(config = %config_path.display(), "Loaded pipeline config");
        if !args.inputs.is_empty() {
            config.inputs = args.inputs.iter().map(PathBuf::from).collect();
        }
        config
    } else {
        build_config_from_args(args)?
    };

    print_run_summary(&config);

    let reporter = Arc::new(IndicatifReporter::default());
    let output = run_pipeline_reported(&config, Arc::new(ProcessExecutor), reporter)
        .context("Pipeline failed")?;

    match output {
        PipelineOutput::Checkpoint(files) => {
            println!(
                "\nStopped before noproj. Resume with --resume-at-no-proj and these {} files:",
                files.len()
            );
            for file in files {
                println!("  {}", file.display());
            }
        }
        PipelineOutput::Mosaic(path) => {
            println!("\nMosaic saved to {}", path.display());
        }
    }

    Ok(())
}

fn build_config_from_args(args: &RunArgs) -> Result<PipelineConfig> {
    let checkpoint = if args.stop_at_no_proj {
        Checkpoint::StopBeforeNoProj
    } else if args.resume_at_no_proj {
        Checkpoint::ResumeAtNoProj
    } else {
        Checkpoint::Full
    };

    let (inputs, download) = match args.download_folder {
        Some(ref folder) => {
            let [url] = args.inputs.as_slice() else {
                crate::Cli::command()
                    .error(
                        ErrorKind::WrongNumberOfValues,
                        "--download-folder needs exactly one URL",
                    )
                    .exit();
            };
            let download = DownloadConfig {
                url: url.clone(),
                folder: folder.clone(),
                image_type: DEFAULT_IMAGE_TYPE.to_string(),
            };
            (Vec::new(), Some(download))
        }
        None => (args.inputs.iter().map(PathBuf::from).collect(), None),
    };

    Ok(PipelineConfig {
        inputs,
        output_dir: args.output_dir.clone(),
        threads: args.threads,
        reference_ccd: args.reference_ccd,
        keep_intermediates: args.keep,
        web_kernels: args.web,
        checkpoint,
        download,
        tool_dir: args.tool_dir.clone(),
    })
}
