use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact digest mismatch expected={expected} got={got}")]
    DigestMismatch { expected: String, got: String },
    #[error("label vocabulary {path:?}: {reason}")]
    Labels { path: PathBuf, reason: String },
    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("read input {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("model emits {got} classes but vocabulary has {expected}")]
    ClassCountMismatch { expected: usize, got: usize },
}
