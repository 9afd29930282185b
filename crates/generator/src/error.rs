use site_kit_core::ImageFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while producing a single derivative or placeholder.
///
/// These never abort a batch; the pipeline records them in the build report.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to render SVG {path}: {reason}")]
    Svg { path: PathBuf, reason: String },

    #[error("Cannot convert {path} to {format}")]
    Unsupported { path: PathBuf, format: ImageFormat },

    #[error("Requested size {width}x{height} for {path} exceeds the {limit} pixel limit")]
    TooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        limit: u64,
    },
}

impl ProcessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProcessError::Io {
            path: path.into(),
            source,
        }
    }
}
