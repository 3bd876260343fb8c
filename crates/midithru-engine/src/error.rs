//! Error types for the pass-through engine.

use thiserror::Error;

use crate::properties::PropertyKey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("event queue is full")]
    QueueFull,

    #[error("message does not fit a 3-byte event record")]
    UnsupportedMessage,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown property id {0}")]
    InvalidProperty(u32),

    #[error("property {0:?} is not readable")]
    PropertyNotReadable(PropertyKey),

    #[error("property {0:?} is not writable")]
    PropertyNotWritable(PropertyKey),

    #[error("wrong value shape for property {0:?}")]
    InvalidPropertyValue(PropertyKey),
}

pub type Result<T> = std::result::Result<T, Error>;
