//! # Trimode CLI
//!
//! Headless renderer for the trimode triangle.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trimode_cli::{CliArgs, HeadlessApp, RunConfig};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trimode_cli=info,trimode_renderer=info,wgpu=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let config = RunConfig::from_args(args)?;

    tracing::info!(
        "Surface {}x{} @{}x, preferred mode {}",
        config.surface.css_width,
        config.surface.css_height,
        config.surface.device_pixel_ratio,
        config.engine.initial_mode
    );

    let summary = HeadlessApp::new(config).run()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
