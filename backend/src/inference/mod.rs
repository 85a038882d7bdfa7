pub mod ensemble;
pub mod model;
pub mod preprocess;
pub mod service;

use std::path::PathBuf;

use crate::config::ConfigError;
use tract_onnx::prelude::tract_ndarray::Array4;

/// NHWC float batch fed to every classifier: `[1, height, width, 3]`.
pub type ImageBatch = Array4<f32>;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to open image {path}: {source}")]
    ImageOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot identify image file {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Failed to load model {name} from {path}: {message}")]
    ModelLoad {
        name: String,
        path: PathBuf,
        message: String,
    },
    #[error("Model {name} failed: {message}")]
    Model { name: String, message: String },
    #[error("Model {name} returned {found} scores, expected {expected}")]
    UnexpectedOutput {
        name: String,
        expected: usize,
        found: usize,
    },
}
