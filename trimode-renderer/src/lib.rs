//! # Trimode Renderer
//!
//! Draws one draggable triangle through three interchangeable backends and
//! switches between them at runtime.
//!
//! ## Rendering Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Engine (probe, fallback, toggle)   │
//! ├─────────────────────────────────────────────┤
//! │            RenderBackend Trait              │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ Accelerated │ Rasterized  │ Software        │
//! │ (wgpu)      │ (WebGL2)    │ (tiny-skia)     │
//! └─────────────┴─────────────┴─────────────────┘
//!        ▲              ▲              ▲
//!        └──────── Surface / Host ─────┘
//! ```
//!
//! Hosts supply surfaces: a browser canvas in `trimode-app`, or the
//! in-memory [`headless`] surface for native tools and tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod capability;
pub mod engine;
pub mod error;
pub mod gl;
pub mod headless;
pub mod surface;

pub use backend::{Backend, RenderBackend, SoftwareBackend, WebGlBackend, WgpuBackend};
pub use capability::{Capabilities, CapabilityProber};
pub use engine::{Engine, EngineStatus, MAX_FALLBACK_HOPS};
pub use error::{EngineError, EngineResult, RenderError, RenderResult};
pub use gl::{GlContext, ShaderStage};
pub use headless::{HeadlessConfig, HeadlessHost, HeadlessSurface, PixelFrame};
pub use surface::{Host, PixelSink, Surface, SurfaceContext};

use serde::{Deserialize, Serialize};
use trimode_core::{BackendOptions, Mode};

/// Default clear color, a dark slate.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.1, 0.12, 0.18, 1.0];

/// Configuration for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Preferred starting mode (falls back if unavailable).
    pub initial_mode: Mode,
    /// Context creation options.
    pub options: BackendOptions,
    /// Background color (linear RGBA).
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Accelerated,
            options: BackendOptions::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
