//! Nearest-neighbour matching of a probe embedding against the gallery.
//!
//! The winner is the entry at minimum Euclidean distance (first one on ties).
//! It counts as a match when its distance is at most the threshold, and the
//! confidence falls linearly from 100 at distance 0 to 0 at the threshold.
//! Confidence is a display score, not a calibrated probability.

use serde::Serialize;

use crate::gallery::Gallery;

/// Conventional operating point for 128-d face embeddings.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Name reported for a face that matches nobody.
pub const UNKNOWN_LABEL: &str = "Неизвестно";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub name: String,
    /// Percentage in [0, 100].
    pub confidence: u8,
    /// Distance to the nearest entry; `None` for an empty gallery.
    pub distance: Option<f32>,
}

impl MatchResult {
    fn unknown(distance: Option<f32>) -> Self {
        Self {
            matched: false,
            name: UNKNOWN_LABEL.to_string(),
            confidence: 0,
            distance,
        }
    }
}

/// Euclidean distance; vectors of different length are infinitely far apart.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// `clamp(round((1 - distance / threshold) * 100), 0, 100)`.
pub fn confidence(distance: f32, threshold: f32) -> u8 {
    let ratio = if threshold > 0.0 {
        distance / threshold
    } else if distance <= 0.0 {
        0.0
    } else {
        1.0
    };
    let score = ((1.0 - ratio) * 100.0).round();
    if score.is_nan() {
        0
    } else {
        score.clamp(0.0, 100.0) as u8
    }
}

/// Classify `probe` against every entry of `gallery`.
pub fn match_probe(gallery: &Gallery, probe: &[f32], threshold: f32) -> MatchResult {
    let mut best: Option<(usize, f32)> = None;
    for (idx, entry) in gallery.iter().enumerate() {
        let distance = euclidean_distance(probe, &entry.embedding);
        log::debug!("distance to #{idx} {}: {distance:.4}", entry.name);
        // Strict comparison keeps the lowest index on ties; NaN never wins.
        if best.map_or(!distance.is_nan(), |(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }

    match best {
        Some((idx, distance)) if distance <= threshold => MatchResult {
            matched: true,
            name: gallery.entries()[idx].name.clone(),
            confidence: confidence(distance, threshold),
            distance: Some(distance),
        },
        Some((_, distance)) => MatchResult::unknown(Some(distance)),
        None => MatchResult::unknown(None),
    }
}
