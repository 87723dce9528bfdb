//! Headless run of the engine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use trimode_core::{Mode, Translation};
use trimode_renderer::{Engine, HeadlessHost, PixelFrame};

use crate::RunConfig;

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Mode that ended up rendering.
    pub mode: Mode,
    /// Whether the engine fell back from the accelerated path.
    pub fallback_active: bool,
    /// Translation after the drags.
    pub translation: Translation,
    /// Frames drawn.
    pub frames_rendered: u64,
    /// Where the PNG was written.
    pub output: PathBuf,
}

/// Drives an [`Engine`] against a [`HeadlessHost`].
pub struct HeadlessApp {
    config: RunConfig,
    engine: Engine<HeadlessHost>,
}

impl HeadlessApp {
    /// Create the host and engine. No backend is built yet.
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        let host = HeadlessHost::new(config.surface);
        let engine = Engine::new(host, config.engine);
        Self { config, engine }
    }

    /// Build a backend, replay the drags, render and write the PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend can be built, no frame was produced or
    /// the PNG cannot be written.
    pub fn run(mut self) -> anyhow::Result<RunSummary> {
        let mode = pollster::block_on(self.engine.init_engine())?;
        tracing::info!("Engine running in {mode} mode");

        let surface = self.engine.host().current();
        for drag in &self.config.drags {
            for event in drag.events() {
                surface.dispatch(&event);
            }
            tracing::debug!("Replayed drag {:?} -> {:?}", drag.from, drag.to);
        }

        for _ in 0..self.config.frames {
            self.engine.frame();
        }

        let frame = surface.last_frame().context("no frame was presented")?;
        write_png(&frame, &self.config.output)?;

        let status = self.engine.status();
        let summary = RunSummary {
            mode: status.mode,
            fallback_active: status.fallback_active,
            translation: self.engine.translation().unwrap_or_default(),
            frames_rendered: status.frames_rendered,
            output: self.config.output.clone(),
        };
        self.engine.shutdown();
        Ok(summary)
    }
}

/// Encode `frame` as PNG at `path`.
fn write_png(frame: &PixelFrame, path: &Path) -> anyhow::Result<()> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .context("frame buffer does not match its dimensions")?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(
        "Wrote {}x{} frame to {}",
        frame.width,
        frame.height,
        path.display()
    );
    Ok(())
}
