/// Core error type.
///
/// Adapter crates map their library errors into this type. Nothing inside the
/// dispatch engine propagates it past a worker; it only surfaces at startup and
/// at the port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, Error>;
