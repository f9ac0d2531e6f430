use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LaneError>;

/// Errors raised by the detection core and the media collaborators
#[derive(Debug, Error)]
pub enum LaneError {
    /// Null/empty frame, wrong channel count, bad parameters or an
    /// unopenable media source
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure inside the detection algorithm for a single frame
    #[error("detection failed: {0}")]
    Detection(String),

    #[error("i/o failure on {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("video codec error: {0}")]
    Video(String),
}

/// Coarse classification used when deciding how far a failure propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    PerFrameDetection,
    Resource,
}

impl LaneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaneError::InvalidInput(_) => ErrorKind::InvalidInput,
            LaneError::Detection(_) => ErrorKind::PerFrameDetection,
            LaneError::Resource { .. } | LaneError::Video(_) => ErrorKind::Resource,
            // Decoding problems mean the source is unusable, encoding ones
            // mean the output could not be produced.
            LaneError::Image(image::ImageError::Decoding(_))
            | LaneError::Image(image::ImageError::Unsupported(_)) => ErrorKind::InvalidInput,
            LaneError::Image(_) => ErrorKind::Resource,
        }
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LaneError::Resource {
            path: path.into(),
            source,
        }
    }
}
