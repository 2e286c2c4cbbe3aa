use thiserror::Error;

#[derive(Debug, Error)]
pub enum RideauError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("connector error: {0}")]
    Connector(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
