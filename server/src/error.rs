use shared::FrameError;
use std::io;
use thiserror::Error;

/// The peer's outbound queue is gone; the connection is closing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("connection closed")]
    Closed,
}

/// Settings the server refuses to start with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("world {axis} {value} is outside 1..={max}")]
    WorldDimension {
        axis: &'static str,
        value: i32,
        max: i32,
    },
}

/// Failures that end a single connection. They never reach other connections.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
