use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use bingwall::bing::Bing;
use bingwall::config::{Cli, RunConfig};
use bingwall::setter::DesktopWallpaper;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli: Cli = Cli::parse();
    let config = RunConfig::load(&cli).context("Error loading configuration")?;
    println!("Download directory {}", config.download_dir.display());

    let bing = Bing::new(config);
    let outcome = bing
        .sync(&DesktopWallpaper)
        .await
        .context("Bing wallpaper sync failed")?;

    println!("{}", outcome.target.download_url);
    println!("{}", outcome.target.image_id);
    if let Some(copyright) = &outcome.image.copyright {
        println!("{}", copyright.dimmed());
    }
    match outcome.downloaded {
        Some(bytes) => println!(
            "Image {} downloaded ({bytes} bytes)",
            outcome.target.file_name.green()
        ),
        None => println!(
            "Image {} has already been downloaded",
            outcome.target.file_name.yellow()
        ),
    }
    println!("{} {}", "Image set as wallpaper:".bold(), outcome.path.display());

    Ok(())
}
