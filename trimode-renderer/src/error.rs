//! Renderer and engine error types.

use thiserror::Error;
use trimode_core::SurfaceError;

/// Result type for backend operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while creating or driving a backend.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The graphics capability or surface context this backend needs is missing.
    ///
    /// The engine recovers from this by falling back one mode.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Shader/program compilation or buffer allocation failed.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Surface/swapchain error.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Rendering a frame failed.
    #[error("Frame render failed: {0}")]
    Frame(String),

    /// The backend was disposed and must not be used again.
    #[error("Backend already disposed")]
    Disposed,
}

impl From<SurfaceError> for RenderError {
    fn from(err: SurfaceError) -> Self {
        match err {
            SurfaceError::ContextUnavailable(_) => Self::BackendUnavailable(err.to_string()),
            SurfaceError::PointerCaptureFailed(_) | SurfaceError::Host(_) => {
                Self::Surface(err.to_string())
            }
        }
    }
}

/// Errors reported by the [`Engine`](crate::Engine) to its host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A backend failed for a reason the fallback chain does not cover.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Every mode on the fallback chain was unavailable.
    #[error("No rendering backend available after {attempts} attempts: {reason}")]
    Exhausted {
        /// Number of backend constructions attempted.
        attempts: usize,
        /// Reason reported by the last attempt.
        reason: String,
    },

    /// `toggle_option` received a name it does not know.
    #[error("Unknown backend option: {0}")]
    UnknownOption(String),

    /// The host could not provide a surface.
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
}
