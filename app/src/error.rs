//! Application error type.

use thiserror::Error;

use vista_graphics::GraphicsError;

/// Errors that end the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
