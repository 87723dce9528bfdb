//! # Trimode CLI
//!
//! Native headless host for trimode.
//!
//! Runs the engine on an in-memory surface, replays scripted drags, renders
//! a number of frames and writes the last one as a PNG. There is no window,
//! so the accelerated and rasterized modes fall back to the software backend,
//! which makes this a quick way to watch the fallback chain in the logs.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p trimode-cli -- --drag 320,200:400,250 --output triangle.png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `RunConfig` - Surface size, engine config and drag script
//! - `HeadlessApp` - Drives the engine against a `HeadlessHost`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod app;
mod script;

pub use app::{HeadlessApp, RunSummary};
pub use script::{Drag, DragParseError};

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use trimode_core::Mode;
use trimode_renderer::{EngineConfig, HeadlessConfig};

/// Command-line arguments for trimode.
#[derive(Debug, Clone, Parser)]
#[command(name = "trimode")]
#[command(about = "Render the trimode triangle headlessly and save it as PNG")]
#[command(version)]
pub struct CliArgs {
    /// Surface width in CSS pixels
    #[arg(long, default_value = "640")]
    pub width: f64,

    /// Surface height in CSS pixels
    #[arg(long, default_value = "400")]
    pub height: f64,

    /// Device pixel ratio
    #[arg(long, default_value = "1.0")]
    pub dpr: f64,

    /// Preferred mode: accelerated, rasterized or software
    #[arg(long, env = "TRIMODE_MODE")]
    pub mode: Option<Mode>,

    /// Number of frames to render after the drags
    #[arg(long, default_value = "1")]
    pub frames: u32,

    /// Drag to replay, as `x0,y0:x1,y1` in CSS pixels (repeatable)
    #[arg(long = "drag")]
    pub drags: Vec<Drag>,

    /// JSON engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Advertise the accelerated API to the capability probe
    #[arg(long)]
    pub advertise_accelerated: bool,

    /// Where to write the final frame
    #[arg(long, short, default_value = "triangle.png")]
    pub output: PathBuf,
}

/// Everything a headless run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Surface settings.
    pub surface: HeadlessConfig,
    /// Engine settings.
    pub engine: EngineConfig,
    /// Drags replayed after the backend starts.
    pub drags: Vec<Drag>,
    /// Frames rendered after the drags.
    pub frames: u32,
    /// PNG destination.
    pub output: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            surface: HeadlessConfig::default(),
            engine: EngineConfig::default(),
            drags: Vec::new(),
            frames: 1,
            output: PathBuf::from("triangle.png"),
        }
    }
}

impl RunConfig {
    /// Build a run config from CLI arguments, reading `--config` if given.
    ///
    /// `--mode` overrides the file's initial mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn from_args(args: CliArgs) -> anyhow::Result<Self> {
        let mut engine = match &args.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                EngineConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => EngineConfig::default(),
        };
        if let Some(mode) = args.mode {
            engine.initial_mode = mode;
        }

        Ok(Self {
            surface: HeadlessConfig {
                css_width: args.width,
                css_height: args.height,
                device_pixel_ratio: args.dpr,
                accelerated_present: args.advertise_accelerated,
            },
            engine,
            drags: args.drags,
            frames: args.frames,
            output: args.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = CliArgs::parse_from(["trimode"]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(config.surface, HeadlessConfig::default());
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.frames, 1);
        assert!(config.drags.is_empty());
    }

    #[test]
    fn test_args_mode_and_drags() {
        let args = CliArgs::parse_from([
            "trimode",
            "--mode",
            "webgl",
            "--drag",
            "0,0:10,10",
            "--drag",
            "10,10:20,0",
            "--dpr",
            "2",
        ]);
        let config = RunConfig::from_args(args).unwrap();
        assert_eq!(config.engine.initial_mode, Mode::Rasterized);
        assert_eq!(config.drags.len(), 2);
        assert!((config.surface.device_pixel_ratio - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_args_reject_bad_drag() {
        assert!(CliArgs::try_parse_from(["trimode", "--drag", "1,2"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let args = CliArgs::parse_from(["trimode", "--config", "/nonexistent/trimode.json"]);
        assert!(RunConfig::from_args(args).is_err());
    }
}
