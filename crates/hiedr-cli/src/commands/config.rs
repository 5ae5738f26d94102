use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hiedr_core::pipeline::config::PipelineConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default PipelineConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig {
        inputs: (0..=9)
            .flat_map(|ccd| {
                [0, 1].map(|channel| {
                    PathBuf::from(format!("ESP_011277_1825_RED{ccd}_{channel}.IMG"))
                })
            })
            .collect(),
        ..Default::default()
    };
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
