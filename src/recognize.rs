use image::DynamicImage;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::gallery::Gallery;
use crate::matcher::{match_probe, MatchResult};
use faceroll_vision::FaceEncoder;

/// A face found in a frame together with its gallery decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceMatch {
    /// x, y, w, h in frame pixels.
    pub region: [f32; 4],
    pub detection_score: f32,
    #[serde(flatten)]
    pub result: MatchResult,
}

/// One detect → embed → match pass over a single frame.
///
/// The gallery is borrowed: callers load it once at startup and reuse it for
/// every frame. An empty result means no face was detected.
pub fn recognize<E: FaceEncoder>(
    encoder: &mut E,
    gallery: &Gallery,
    frame: &DynamicImage,
    threshold: f32,
) -> Result<Vec<FaceMatch>> {
    let faces = encoder.detect_faces(frame).map_err(Error::Vision)?;
    if faces.is_empty() {
        return Ok(Vec::new());
    }
    let embeddings = encoder
        .extract_embeddings(frame, &faces)
        .map_err(Error::Vision)?;
    if embeddings.len() != faces.len() {
        return Err(Error::Vision(anyhow::anyhow!(
            "encoder returned {} embeddings for {} faces",
            embeddings.len(),
            faces.len()
        )));
    }

    Ok(faces
        .iter()
        .zip(&embeddings)
        .map(|(face, embedding)| FaceMatch {
            region: face.bbox,
            detection_score: face.score,
            result: match_probe(gallery, &embedding.values, threshold),
        })
        .collect())
}
