//! # Trimode Core
//!
//! Backend-agnostic pieces shared by every trimode renderer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                trimode-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Geometry        │  Pointer-Drag Tracker    │
//! │  - Vertices      │  - Idle / dragging       │
//! │  - Colors        │  - Capture handling      │
//! ├─────────────────────────────────────────────┤
//! │  Translation     │  Mode                    │
//! │  - Clamped NDC   │  - Toggle cycle          │
//! │  - Shared handle │  - Fallback chain        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate touches a graphics API. Renderers in
//! `trimode-renderer` consume these types and add device resources.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod geometry;
pub mod mode;
pub mod tracker;
pub mod translation;

pub use error::{SurfaceError, SurfaceResult};
pub use event::{ListenerKind, PointerEvent, PointerPhase, SurfaceEvent};
pub use geometry::{flat_color, interleaved_vertices, Vertex, FLOATS_PER_VERTEX, TRIANGLE};
pub use mode::{BackendOptions, Mode, OptionName};
pub use tracker::{PointerDragTracker, PointerState, PointerTarget};
pub use translation::{Translation, TranslationHandle, TRANSLATION_LIMIT};

/// Trimode core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
