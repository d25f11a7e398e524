//! Console front end for the plugin loader.
use std::process::ExitCode;

use log::warn;
use mosaic_core::{HostArgs, LoadReport, PluginLoader};

/// Print every discovered manifest
pub fn list(loader: &mut PluginLoader) -> ExitCode {
    loader.discover();
    let manifests: Vec<_> = loader.manifests().collect();
    if manifests.is_empty() {
        println!("No plugins found.");
        return ExitCode::SUCCESS;
    }

    println!("Discovered {} plugin(s):", manifests.len());
    for manifest in manifests {
        match &manifest.version {
            Some(version) => println!("  {} {} ({})", manifest.id, version, manifest.name),
            None => println!("  {} ({})", manifest.id, manifest.name),
        }
        println!("      path: {}", manifest.source_path.display());
        if !manifest.dependencies.is_empty() {
            println!("      depends on: {}", manifest.dependencies.join(", "));
        }
    }
    ExitCode::SUCCESS
}

/// Load everything without enabling it
pub fn check(loader: &mut PluginLoader) -> ExitCode {
    loader.discover();
    let report = loader.load_all(&HostArgs::new());
    print_report(&report);
    exit_code(&report)
}

/// Load, enable, then disable everything
pub fn run(loader: &mut PluginLoader) -> ExitCode {
    let report = match loader.quickload(&HostArgs::new()) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Failed to enable plugins: {}", e);
            return ExitCode::FAILURE;
        }
    };
    print_report(&report);
    println!("Enabled {} plugin(s).", loader.loaded_ids().len());

    if let Err(e) = loader.disable_all() {
        warn!("Shutdown incomplete: {}", e);
    }
    exit_code(&report)
}

fn print_report(report: &LoadReport) {
    for id in report.loaded.iter().chain(report.already_loaded.iter()) {
        println!("ok      {}", id);
    }
    for (id, error) in &report.failed {
        println!("FAILED  {} [{}]: {}", id, error.kind(), error);
    }
    println!(
        "{} loaded, {} failed",
        report.loaded.len() + report.already_loaded.len(),
        report.failed.len()
    );
}

fn exit_code(report: &LoadReport) -> ExitCode {
    if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
