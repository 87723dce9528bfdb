//! Error types for host surface operations.

use thiserror::Error;

use crate::Mode;

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Errors a host surface can report.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The surface cannot yield a context of the requested kind.
    #[error("{0} context unavailable on this surface")]
    ContextUnavailable(Mode),

    /// Setting or releasing pointer capture failed.
    ///
    /// Capture is best-effort; callers swallow this.
    #[error("Pointer capture failed: {0}")]
    PointerCaptureFailed(String),

    /// Any other host-side failure (element lookup, DOM call, ...).
    #[error("Host error: {0}")]
    Host(String),
}
