use anyhow::{ensure, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::yunet;

/// Side of the square YuNet input.
pub const DETECTOR_INPUT: u32 = 640;
/// Side of the square SFace input.
pub const FACE_SIZE: u32 = 112;

// SFace reference eye positions in a 112x112 crop.
const REF_LEFT_EYE: (f32, f32) = (38.2946, 51.6963);
const REF_RIGHT_EYE: (f32, f32) = (73.5318, 51.5014);

/// A face found by the detector, in source image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    /// Five points as x, y pairs: eyes, nose tip, mouth corners (image left first).
    pub landmarks: [f32; 10],
}

/// L2-normalised face embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Wrap a raw recognizer output, scaling it to unit length.
    pub fn normalized(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }
}

/// Square-canvas resize that keeps the aspect ratio.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, side: u32) -> Self {
        let scale = side as f32 / width.max(height) as f32;
        let scaled_w = (width as f32 * scale) as u32;
        let scaled_h = (height as f32 * scale) as u32;
        Self {
            scale,
            pad_x: ((side - scaled_w) / 2) as f32,
            pad_y: ((side - scaled_h) / 2) as f32,
        }
    }

    fn apply(&self, img: &DynamicImage, side: u32) -> RgbImage {
        let (width, height) = img.dimensions();
        let scaled = img.resize_exact(
            (width as f32 * self.scale) as u32,
            (height as f32 * self.scale) as u32,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::new(side, side);
        image::imageops::overlay(
            &mut canvas,
            &scaled.to_rgb8(),
            self.pad_x as i64,
            self.pad_y as i64,
        );
        canvas
    }

    /// Map a canvas point back into source image coordinates.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Planar BGR float tensor `[1, 3, h, w]` with values in [0, 255].
fn bgr_tensor(img: &RgbImage) -> Result<Array4<f32>> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, px) in img.pixels().enumerate() {
        data[i] = px[2] as f32;
        data[plane + i] = px[1] as f32;
        data[2 * plane + i] = px[0] as f32;
    }
    Ok(Array4::from_shape_vec(
        (1, 3, height as usize, width as usize),
        data,
    )?)
}

/// Detect faces with YuNet. Results are sorted by score, best first.
pub fn detect_faces(
    session: &mut Session,
    img: &DynamicImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let (width, height) = img.dimensions();
    ensure!(width > 0 && height > 0, "empty image");

    let letterbox = Letterbox::fit(width, height, DETECTOR_INPUT);
    let canvas = letterbox.apply(img, DETECTOR_INPUT);
    let input = Value::from_array(bgr_tensor(&canvas)?)?;

    let outputs = session.run(ort::inputs![input])?;
    let mut owned: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        owned.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let tensors: Vec<yunet::Tensor<'_>> = owned
        .iter()
        .map(|(shape, data)| yunet::Tensor { shape, data })
        .collect();

    let candidates = yunet::decode(&tensors, DETECTOR_INPUT as usize, score_threshold)?;
    log::debug!("yunet: {} candidates above {score_threshold}", candidates.len());

    let detections = candidates
        .into_iter()
        .map(|c| {
            let (x, y) = letterbox.unmap(c.bbox[0], c.bbox[1]);
            let mut landmarks = [0.0f32; 10];
            for (out, point) in landmarks.chunks_exact_mut(2).zip(c.landmarks.chunks_exact(2)) {
                let (lx, ly) = letterbox.unmap(point[0], point[1]);
                out[0] = lx;
                out[1] = ly;
            }
            Detection {
                bbox: [x, y, c.bbox[2] / letterbox.scale, c.bbox[3] / letterbox.scale],
                score: c.score,
                landmarks,
            }
        })
        .collect();

    Ok(nms(detections, nms_threshold))
}

/// Greedy non-maximum suppression. Always returns detections sorted by score;
/// a threshold of 1.0 or more keeps everything.
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    if iou_threshold >= 1.0 {
        return detections;
    }

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept
            .iter()
            .all(|k| compute_iou(&k.bbox, &candidate.bbox) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let w = (a[0] + a[2]).min(b[0] + b[2]) - a[0].max(b[0]);
    let h = (a[1] + a[3]).min(b[1] + b[3]) - a[1].max(b[1]);
    if w <= 0.0 || h <= 0.0 {
        return 0.0;
    }
    let inter = w * h;
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}

fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let corners = [
        (img.get_pixel(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (img.get_pixel(x1, y0), fx * (1.0 - fy)),
        (img.get_pixel(x0, y1), (1.0 - fx) * fy),
        (img.get_pixel(x1, y1), fx * fy),
    ];
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let v: f32 = corners.iter().map(|(p, wt)| p[c] as f32 * wt).sum();
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}

/// Rotate, scale and crop the face so the eyes land on the SFace reference
/// positions of a `size` x `size` crop.
pub fn align_face(img: &DynamicImage, detection: &Detection, size: u32) -> Result<RgbImage> {
    let left = (detection.landmarks[0], detection.landmarks[1]);
    let right = (detection.landmarks[2], detection.landmarks[3]);
    let (dx, dy) = (right.0 - left.0, right.1 - left.1);
    let eye_dist = (dx * dx + dy * dy).sqrt();
    ensure!(eye_dist > f32::EPSILON, "degenerate landmarks");

    let unit = size as f32 / FACE_SIZE as f32;
    let ref_dist = (REF_RIGHT_EYE.0 - REF_LEFT_EYE.0).hypot(REF_RIGHT_EYE.1 - REF_LEFT_EYE.1);
    let scale = unit * ref_dist / eye_dist;
    let (sin, cos) = dy.atan2(dx).sin_cos();

    let eye_center = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
    let ref_center = (
        (REF_LEFT_EYE.0 + REF_RIGHT_EYE.0) / 2.0 * unit,
        (REF_LEFT_EYE.1 + REF_RIGHT_EYE.1) / 2.0 * unit,
    );

    // Inverse mapping: crop pixel -> source pixel.
    let src = img.to_rgb8();
    let mut crop = RgbImage::new(size, size);
    for (ox, oy, px) in crop.enumerate_pixels_mut() {
        let u = ox as f32 - ref_center.0;
        let v = oy as f32 - ref_center.1;
        let sx = eye_center.0 + (cos * u - sin * v) / scale;
        let sy = eye_center.1 + (sin * u + cos * v) / scale;
        if let Some(sample) = sample_bilinear(&src, sx, sy) {
            *px = sample;
        }
    }
    Ok(crop)
}

/// Run SFace on an aligned crop.
pub fn encode_face(session: &mut Session, face: &RgbImage) -> Result<Embedding> {
    let input = if face.dimensions() == (FACE_SIZE, FACE_SIZE) {
        bgr_tensor(face)?
    } else {
        let resized = image::imageops::resize(face, FACE_SIZE, FACE_SIZE, FilterType::Triangle);
        bgr_tensor(&resized)?
    };

    let outputs = session.run(ort::inputs![Value::from_array(input)?])?;
    let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
    ensure!(!data.is_empty(), "recognizer returned an empty embedding");
    Ok(Embedding::normalized(data.to_vec()))
}
