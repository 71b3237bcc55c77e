use anyhow::{Context, Result};
use clap::Parser;
use dependency_lister::cli::{print_bundle, print_report, ListerCli};
use dependency_lister::ListerConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ListerCli::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    info!("Starting dependency-lister v{}", env!("CARGO_PKG_VERSION"));

    let base = match &cli.config {
        Some(path) => ListerConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ListerConfig::default(),
    };
    let config = cli.apply_to(base);

    let report = config
        .builder()
        .build_async(cli.binaries.clone())
        .await
        .context("Dependency listing failed")?;

    if cli.bundle {
        let files = report.bundle_files(&cli.binaries);
        print_bundle(&files, cli.format).context("Failed to render bundle list")?;
    } else {
        print_report(&report, cli.format).context("Failed to render report")?;
    }

    if !report.is_clean() {
        warn!("{} binaries could not be analyzed", report.errors.len());
        std::process::exit(1);
    }

    Ok(())
}
