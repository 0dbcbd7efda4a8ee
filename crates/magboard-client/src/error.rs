use magboard_core::storage::GatewayError;
use magboard_render::RendererError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
    #[error("{name} must be {expected}, got {value:?}")]
    InvalidVar {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Render(#[from] RendererError),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
