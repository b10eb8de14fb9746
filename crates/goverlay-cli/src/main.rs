use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use goverlay_core::{
    augment_package, init_tracing, init_tracing_with, OverlayConfig, PackageLayout,
};
use tracing::debug;

fn cli() -> Command {
    Command::new("goverlay")
        .version(goverlay_core::VERSION)
        .about("Augment a Go package with overlay sources, pruning the symbols they replace")
        .arg(
            Arg::new("upstream")
                .long("upstream")
                .value_name("DIR")
                .help("Directory holding the upstream package sources")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("DIR")
                .help("Directory receiving the augmented package")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("overlay")
                .long("overlay")
                .value_name("DIR")
                .help("Directory holding the overlay sources")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("marker")
                .long("marker")
                .value_name("NAME")
                .help("Toolchain name written into placeholder comments"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .help("Number of upstream files processed concurrently")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("no-link")
                .long("no-link")
                .help("Copy unmodified files instead of symlinking them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    if matches.get_flag("debug") {
        init_tracing_with("goverlay_core=debug");
    } else {
        init_tracing();
    }

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => OverlayConfig::from_json_file(path)?,
        None => OverlayConfig::default(),
    };
    if let Some(marker) = matches.get_one::<String>("marker") {
        config.marker = marker.clone();
    }
    if let Some(&workers) = matches.get_one::<usize>("workers") {
        config.workers = workers.max(1);
    }
    if matches.get_flag("no-link") {
        config.link_unmodified = false;
    }
    debug!(?config, "configuration loaded");

    let upstream = matches
        .get_one::<PathBuf>("upstream")
        .context("missing --upstream")?;
    let output = matches
        .get_one::<PathBuf>("output")
        .context("missing --output")?;

    let mut layout = PackageLayout::new(upstream, output);
    if let Some(overlay) = matches.get_one::<PathBuf>("overlay") {
        layout = layout.with_overlay(overlay);
    }

    let summary = augment_package(&layout, &config)
        .with_context(|| format!("failed to augment {}", upstream.display()))?;

    for report in summary.failures() {
        if let Err(e) = &report.result {
            eprintln!("{}: {e}", report.path.display());
        }
    }
    println!(
        "{} files: {} rewritten, {} linked, {} copied, {} failed ({} overlay symbols)",
        summary.reports.len(),
        summary.rewritten(),
        summary.linked(),
        summary.copied(),
        summary.failures().count(),
        summary.symbols_collected,
    );

    if !summary.success() {
        bail!("{} file(s) failed", summary.failures().count());
    }
    Ok(())
}
