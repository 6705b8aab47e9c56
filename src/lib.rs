pub mod annotate;
pub mod builder;
pub mod config;
pub mod error;
pub mod gallery;
pub mod matcher;
pub mod recognize;
pub mod storage;

pub use error::{Error, Result};
pub use gallery::{Gallery, GalleryEntry};
pub use matcher::{match_probe, MatchResult, DEFAULT_THRESHOLD, UNKNOWN_LABEL};

// Re-export vision types for convenience
pub use faceroll_vision::{Detection, Embedding, FaceEncoder, ModelPaths, Pipeline};
