use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed journal record (got '{line}'): {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error("chat connection closed")]
    ConnectionClosed,

    #[error("delivery queue closed")]
    QueueClosed,
}
