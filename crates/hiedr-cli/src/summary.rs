use console::Style;
use hiedr_core::pipeline::config::PipelineConfig;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("HiRISE EDR Mosaic"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(17)));
    println!();

    match config.download {
        Some(ref download) => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Source"),
                s.path.apply_to(&download.url)
            );
            println!(
                "  {:<14}{}",
                s.label.apply_to("Download to"),
                s.path.apply_to(download.folder.display())
            );
        }
        None => {
            println!(
                "  {:<14}{}",
                s.label.apply_to("Inputs"),
                s.value.apply_to(format!("{} files", config.inputs.len()))
            );
        }
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output dir"),
        s.path.apply_to(config.output_dir.display())
    );
    if let Some(ref dir) = config.tool_dir {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Tools"),
            s.path.apply_to(dir.display())
        );
    }
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Threads"),
        s.value.apply_to(config.threads)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Match CCD"),
        s.value.apply_to(format!("RED{}", config.reference_ccd))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Run"),
        s.method.apply_to(config.checkpoint)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("SPICE"),
        if config.web_kernels {
            s.method.apply_to("web kernels")
        } else {
            s.disabled.apply_to("local kernels")
        }
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Intermediates"),
        if config.keep_intermediates {
            s.method.apply_to("kept")
        } else {
            s.disabled.apply_to("deleted")
        }
    );
    println!();
}
