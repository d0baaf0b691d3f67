//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the graphics system.
///
/// Contract violations (out-of-range frame slots, double retirement,
/// illegal target lifecycle transitions) are not represented here: they
/// indicate a bug in the calling code and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to initialize the graphics system.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// Failed to destroy a resource. A resource stuck on the GPU cannot be
    /// ignored, so callers treat this as fatal.
    #[error("resource destruction failed: {0}")]
    DestroyFailed(String),
    /// A requested feature or configuration is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The surface was lost and needs to be recreated.
    #[error("surface lost, needs recreation")]
    SurfaceLost,
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::InitializationFailed("no GPU found".to_string());
        assert_eq!(err.to_string(), "initialization failed: no GPU found");

        let err = GraphicsError::DestroyFailed("image #7".to_string());
        assert_eq!(err.to_string(), "resource destruction failed: image #7");
    }
}
