use anyhow::Context;
use colored::Colorize;
use distmerge_engine::{MergeConfig, MergeEngine, MergeReport, StripReport, StripTargets, Stripper};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Merge(args) => cmd_merge(args, format),
        Command::Strip(args) => cmd_strip(args, format),
    }
}

/// Load the optional config file and layer the flags over it.
fn merge_config(args: &MergeArgs) -> anyhow::Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::load(path).context("loading run configuration")?,
        None => MergeConfig::default(),
    };
    if let Some(scheme) = args.ann {
        config.annotation = Some(scheme.name().to_string());
    }
    if args.inject {
        config.inject = true;
    }
    if args.no_inject {
        config.inject = false;
    }
    config.keep_data |= args.keep_data;
    config.keep_meta |= args.keep_meta;
    config.bundled |= args.bundled;
    config.whitelist.extend(args.whitelist.iter().cloned());
    config.whitelist_packages.extend(args.whitelist_pkg.iter().cloned());
    config.whitelist_maps.extend(args.whitelist_map.iter().cloned());
    config.blacklist.extend(args.blacklist.iter().cloned());
    config.blacklist_packages.extend(args.blacklist_pkg.iter().cloned());
    config.blacklist_maps.extend(args.blacklist_map.iter().cloned());
    Ok(config)
}

fn cmd_merge(args: MergeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = merge_config(&args)?;
    let engine = MergeEngine::from_config(&args.client, &args.server, &args.output, &config)
        .context("invalid merge configuration")?;
    let report = engine.run().with_context(|| {
        format!(
            "merging {} and {} into {}",
            args.client.display(),
            args.server.display(),
            args.output.display()
        )
    })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_merge(&args, &config, &report),
    }
    Ok(())
}

fn print_merge(args: &MergeArgs, config: &MergeConfig, report: &MergeReport) {
    println!(
        "{} Merged {} + {} → {}",
        "✓".green().bold(),
        args.client.display().to_string().bold(),
        args.server.display().to_string().bold(),
        args.output.display().to_string().cyan()
    );
    match &report.scheme {
        Some(scheme) if config.inject => println!("  Markers: {} (types injected)", scheme.yellow()),
        Some(scheme) => println!("  Markers: {}", scheme.yellow()),
        None => println!("  Markers: {}", "none".dimmed()),
    }
    println!(
        "  Classes: {} shared, {} client only, {} server only, {} filtered",
        report.shared_classes.to_string().bold(),
        report.client_only_classes.to_string().green(),
        report.server_only_classes.to_string().blue(),
        report.filtered_classes
    );
    println!(
        "  Members: {} client only, {} server only",
        report.client_only_members.to_string().green(),
        report.server_only_members.to_string().blue()
    );
    if report.resources > 0 {
        println!("  Resources: {}", report.resources);
    }
}

fn cmd_strip(args: StripArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut targets = StripTargets::new();
    for data in &args.data {
        targets
            .load(data)
            .with_context(|| format!("reading strip data {}", data.display()))?;
    }
    let report = Stripper::new(targets)
        .process(&args.input, &args.output)
        .with_context(|| format!("stripping {} into {}", args.input.display(), args.output.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_strip(&args, &report),
    }
    Ok(())
}

fn print_strip(args: &StripArgs, report: &StripReport) {
    println!("Input:  {}", args.input.display());
    println!("Output: {}", args.output.display());
    for data in &args.data {
        println!("Data:   {}", data.display());
    }
    println!(
        "{} Stripped {} markers from {} classes ({} entries copied)",
        "✓".green().bold(),
        report.markers_removed.to_string().bold(),
        report.classes_rewritten.to_string().yellow(),
        report.entries
    );
}
