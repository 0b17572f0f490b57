use thiserror::Error;

/// All errors produced by chirp-core.
#[derive(Debug, Error)]
pub enum ChirpError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoInputDevice,

    #[error("input device {index} not found")]
    DeviceNotFound { index: usize },

    #[error("inference error: {0}")]
    Inference(String),

    #[error("no session is running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChirpError>;
