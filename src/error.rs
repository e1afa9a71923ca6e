use std::path::PathBuf;

use thiserror::Error;

/// Library error type for spot-light operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The picture directory is missing or not a directory.
    #[error("invalid picture directory: {0}")]
    BadDir(String),

    /// The picture directory holds no candidate image.
    #[error("no image found in {0}")]
    NotFound(String),

    /// The selected file could not be decoded.
    #[error("failed to decode {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// No picture directory was configured and no environment fallback is set.
    #[error("picture directory not configured: {0}")]
    EnvironmentMissing(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Rendering/display error from the viewer.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}
