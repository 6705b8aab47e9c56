use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

pub const DETECTOR_FILE: &str = "face_detection_yunet_2023mar.onnx";
pub const RECOGNIZER_FILE: &str = "face_recognition_sface_2021dec.onnx";

/// Locations of the two ONNX models the pipeline needs.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub recognizer: PathBuf,
}

impl ModelPaths {
    /// Both models under `dir`, using their upstream file names.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            detector: dir.join(DETECTOR_FILE),
            recognizer: dir.join(RECOGNIZER_FILE),
        }
    }

    pub fn exist(&self) -> bool {
        self.detector.is_file() && self.recognizer.is_file()
    }
}

pub fn session_builder() -> Result<SessionBuilder> {
    #[allow(unused_mut)]
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

fn load_session(path: &Path, kind: &str) -> Result<Session> {
    ensure!(
        path.is_file(),
        "{kind} model not found at {}",
        path.display()
    );
    let session = session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load {kind} model {}", path.display()))?;
    log::debug!("loaded {kind} model from {}", path.display());
    Ok(session)
}

pub fn detector_session(path: &Path) -> Result<Session> {
    load_session(path, "detector")
}

pub fn recog_session(path: &Path) -> Result<Session> {
    load_session(path, "recognition")
}
