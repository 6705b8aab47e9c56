//! YuNet detector post-processing.
//!
//! YuNet is anchor-free: every cell of the stride 8, 16 and 32 grids predicts
//! exactly one face candidate. The 2023mar export emits twelve tensors grouped
//! by kind and ordered by stride inside each group:
//!
//! `cls_8, cls_16, cls_32, obj_8, obj_16, obj_32, bbox_8, .., kps_32`
//!
//! with shapes `[1, cells, 1]` for cls/obj, `[1, cells, 4]` for bbox and
//! `[1, cells, 10]` for the five landmarks. A cell at column `c`, row `r`
//! decodes as
//!
//! ```text
//! cx = (c + dx) * stride      w = exp(dw) * stride
//! cy = (r + dy) * stride      h = exp(dh) * stride
//! ```
//!
//! and the face score is `sqrt(cls * obj)`.

use anyhow::{bail, ensure, Context, Result};

pub const STRIDES: [usize; 3] = [8, 16, 32];

const CLS: usize = 0;
const OBJ: usize = 1;
const BBOX: usize = 2;
const KPS: usize = 3;
const CHANNELS: [usize; 4] = [1, 1, 4, 10];

/// One output tensor as handed back by the session.
#[derive(Debug, Clone, Copy)]
pub struct Tensor<'a> {
    pub shape: &'a [i64],
    pub data: &'a [f32],
}

/// Face candidate in network-input pixels, before NMS and letterbox removal.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub landmarks: [f32; 10],
}

/// Combine the classification and objectness heads into one score.
pub fn face_score(cls: f32, obj: f32) -> f32 {
    (cls.clamp(0.0, 1.0) * obj.clamp(0.0, 1.0)).sqrt()
}

fn head<'a>(outputs: &[Tensor<'a>], kind: usize, level: usize, cells: usize) -> Result<&'a [f32]> {
    let index = kind * STRIDES.len() + level;
    let tensor = outputs
        .get(index)
        .with_context(|| format!("missing YuNet output {index}"))?;
    let channels = CHANNELS[kind];
    let expected = [1, cells as i64, channels as i64];
    if tensor.shape != expected {
        bail!(
            "YuNet output {index} has shape {:?}, expected {:?}",
            tensor.shape,
            expected
        );
    }
    ensure!(
        tensor.data.len() == cells * channels,
        "YuNet output {index} holds {} values, expected {}",
        tensor.data.len(),
        cells * channels
    );
    Ok(tensor.data)
}

/// Decode every grid cell scoring at least `score_threshold`.
pub fn decode(
    outputs: &[Tensor<'_>],
    input_size: usize,
    score_threshold: f32,
) -> Result<Vec<Candidate>> {
    ensure!(
        outputs.len() >= CHANNELS.len() * STRIDES.len(),
        "YuNet produced {} outputs, expected {}",
        outputs.len(),
        CHANNELS.len() * STRIDES.len()
    );

    let mut candidates = Vec::new();
    for (level, &stride) in STRIDES.iter().enumerate() {
        let cols = input_size / stride;
        let cells = cols * cols;
        let cls = head(outputs, CLS, level, cells)?;
        let obj = head(outputs, OBJ, level, cells)?;
        let bbox = head(outputs, BBOX, level, cells)?;
        let kps = head(outputs, KPS, level, cells)?;
        let stride = stride as f32;

        for cell in 0..cells {
            let score = face_score(cls[cell], obj[cell]);
            if score < score_threshold {
                continue;
            }
            let col = (cell % cols) as f32;
            let row = (cell / cols) as f32;

            let delta = &bbox[cell * 4..cell * 4 + 4];
            let cx = (col + delta[0]) * stride;
            let cy = (row + delta[1]) * stride;
            let w = delta[2].exp() * stride;
            let h = delta[3].exp() * stride;

            let mut landmarks = [0.0f32; 10];
            let offsets = &kps[cell * 10..cell * 10 + 10];
            for (point, offset) in landmarks.chunks_exact_mut(2).zip(offsets.chunks_exact(2)) {
                point[0] = (col + offset[0]) * stride;
                point[1] = (row + offset[1]) * stride;
            }

            candidates.push(Candidate {
                bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                score,
                landmarks,
            });
        }
    }

    Ok(candidates)
}
