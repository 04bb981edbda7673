use std::path::PathBuf;

use lantern_core::LanternError;
use lantern_renderer::RendererError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read scene {path:?}: {source}")]
    ReadScene {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scene {path:?}: {source}")]
    ParseScene {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteImage {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Lantern(#[from] LanternError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
}
