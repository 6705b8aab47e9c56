use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;

use crate::face::{self, Detection, Embedding, FACE_SIZE};
use crate::model::{self, ModelPaths};

/// Something that can find faces in an image and turn them into embeddings.
pub trait FaceEncoder {
    /// Face regions, most confident first.
    fn detect_faces(&mut self, img: &DynamicImage) -> Result<Vec<Detection>>;

    /// One embedding per region, in the same order as `faces`.
    fn extract_embeddings(
        &mut self,
        img: &DynamicImage,
        faces: &[Detection],
    ) -> Result<Vec<Embedding>>;

    /// Detect then embed every face in `img`.
    fn face_embeddings(&mut self, img: &DynamicImage) -> Result<Vec<Embedding>> {
        let faces = self.detect_faces(img)?;
        self.extract_embeddings(img, &faces)
    }
}

/// Full pipeline: detect faces → align → encode
pub struct Pipeline {
    detector: Session,
    encoder: Session,
    score_threshold: f32,
    nms_threshold: f32,
}

impl Pipeline {
    pub fn new(models: &ModelPaths) -> Result<Self> {
        Ok(Self {
            detector: model::detector_session(&models.detector)?,
            encoder: model::recog_session(&models.recognizer)?,
            score_threshold: 0.6,
            nms_threshold: 0.3,
        })
    }

    pub fn with_thresholds(mut self, score_threshold: f32, nms_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self.nms_threshold = nms_threshold;
        self
    }
}

impl FaceEncoder for Pipeline {
    fn detect_faces(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        face::detect_faces(
            &mut self.detector,
            img,
            self.score_threshold,
            self.nms_threshold,
        )
        .context("detecting faces")
    }

    fn extract_embeddings(
        &mut self,
        img: &DynamicImage,
        faces: &[Detection],
    ) -> Result<Vec<Embedding>> {
        faces
            .iter()
            .map(|det| {
                let crop = face::align_face(img, det, FACE_SIZE).context("aligning face")?;
                face::encode_face(&mut self.encoder, &crop).context("encoding face")
            })
            .collect()
    }
}
