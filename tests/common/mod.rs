#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use faceroll::{Detection, Embedding, FaceEncoder};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

/// Encoder stand-in driven by pixel colors.
///
/// A black top-left pixel means "no face"; a pure blue one makes the encoder
/// fail. Anything else is one face covering the frame whose embedding is the
/// pixel's color scaled to [0, 1].
#[derive(Default)]
pub struct ColorEncoder {
    pub calls: usize,
}

pub const BLUE: [u8; 3] = [0, 0, 255];

impl FaceEncoder for ColorEncoder {
    fn detect_faces(&mut self, img: &DynamicImage) -> Result<Vec<Detection>> {
        self.calls += 1;
        let px = img.to_rgb8().get_pixel(0, 0).0;
        if px == BLUE {
            bail!("encoder exploded");
        }
        if px == [0, 0, 0] {
            return Ok(Vec::new());
        }
        let (w, h) = img.dimensions();
        Ok(vec![Detection {
            bbox: [0.0, 0.0, w as f32, h as f32],
            score: 0.9,
            landmarks: [0.0; 10],
        }])
    }

    fn extract_embeddings(
        &mut self,
        img: &DynamicImage,
        faces: &[Detection],
    ) -> Result<Vec<Embedding>> {
        let px = img.to_rgb8().get_pixel(0, 0).0;
        Ok(faces
            .iter()
            .map(|_| Embedding {
                values: color_embedding(px),
            })
            .collect())
    }
}

pub fn color_embedding(px: [u8; 3]) -> Vec<f32> {
    px.iter().map(|&c| c as f32 / 255.0).collect()
}

pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("faceroll-{tag}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_photo(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(16, 16, Rgb(color)).save(&path).unwrap();
    path
}

pub fn solid(color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb(color)))
}
