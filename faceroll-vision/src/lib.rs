pub mod face;
pub mod model;
pub mod pipeline;
pub mod video;
pub mod yunet;

// Re-export commonly used types
pub use face::{Detection, Embedding};
pub use model::ModelPaths;
pub use pipeline::{FaceEncoder, Pipeline};
pub use video::Camera;
