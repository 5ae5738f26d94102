use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use hiedr_core::report::parse_report;

#[derive(Args)]
pub struct OffsetsArgs {
    /// Registration report written by hijitreg (flat_<i>_<j>.txt)
    pub report: PathBuf,
}

pub fn run(args: &OffsetsArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.report)
        .with_context(|| format!("Failed to read report {}", args.report.display()))?;
    let fields = parse_report(&text);

    println!("Report:        {}", args.report.display());
    println!("Sample offset: {}", fields.sample);
    println!("Line offset:   {}", fields.line);

    if fields.offset().is_none() {
        bail!(
            "No usable offsets in {}; the pipeline would place this pair with zero offsets",
            args.report.display()
        );
    }
    Ok(())
}
