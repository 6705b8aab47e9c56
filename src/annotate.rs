use image::{Rgb, RgbImage};
use serde::Serialize;

use crate::matcher::UNKNOWN_LABEL;
use crate::recognize::FaceMatch;

pub const KNOWN_COLOR: [u8; 3] = [0, 255, 0];
pub const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];

const OUTLINE_WIDTH: u32 = 2;
/// Height of the filled label band. Stands in for text height plus padding
/// until glyphs are rendered onto the band.
const LABEL_BAND: u32 = 20;

/// What the renderer should draw for one face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub region: [f32; 4],
    pub label: String,
    pub color: [u8; 3],
}

impl Annotation {
    /// Known faces read `{prefix}{name} ({confidence}%)`; unknown faces carry
    /// the bare unknown label.
    pub fn new(face: &FaceMatch, prefix: &str) -> Self {
        let (label, color) = if face.result.matched {
            (
                format!(
                    "{prefix}{} ({}%)",
                    face.result.name, face.result.confidence
                ),
                KNOWN_COLOR,
            )
        } else {
            (UNKNOWN_LABEL.to_string(), UNKNOWN_COLOR)
        };
        Self {
            region: face.region,
            label,
            color,
        }
    }
}

pub fn annotations(faces: &[FaceMatch], prefix: &str) -> Vec<Annotation> {
    faces.iter().map(|face| Annotation::new(face, prefix)).collect()
}

/// Integer pixel box clipped to the image, as `(x0, y0, x1, y1)` exclusive.
fn clip(region: [f32; 4], width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = region[0].max(0.0).round() as u32;
    let y0 = region[1].max(0.0).round() as u32;
    let x1 = ((region[0] + region[2]).round().max(0.0) as u32).min(width);
    let y1 = ((region[1] + region[3]).round().max(0.0) as u32).min(height);
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn fill(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// Draw each face as an outlined box with a solid label band along its
/// bottom edge. Text is left to the caller.
pub fn draw_annotations(img: &mut RgbImage, annotations: &[Annotation]) {
    let (width, height) = img.dimensions();
    for annotation in annotations {
        let Some((x0, y0, x1, y1)) = clip(annotation.region, width, height) else {
            continue;
        };
        let color = Rgb(annotation.color);
        let t = OUTLINE_WIDTH;

        fill(img, x0, y0, x1, (y0 + t).min(y1), color);
        fill(img, x0, y1.saturating_sub(t).max(y0), x1, y1, color);
        fill(img, x0, y0, (x0 + t).min(x1), y1, color);
        fill(img, x1.saturating_sub(t).max(x0), y0, x1, y1, color);

        let band_top = y1.saturating_sub(LABEL_BAND).max(y0);
        fill(img, x0, band_top, x1, y1, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchResult;

    fn face(matched: bool, name: &str, confidence: u8, region: [f32; 4]) -> FaceMatch {
        FaceMatch {
            region,
            detection_score: 0.9,
            result: MatchResult {
                matched,
                name: name.to_string(),
                confidence,
                distance: Some(0.1),
            },
        }
    }

    #[test]
    fn test_labels_and_colors() {
        let faces = [
            face(true, "Aigerim K", 83, [0.0, 0.0, 10.0, 10.0]),
            face(false, UNKNOWN_LABEL, 0, [5.0, 5.0, 10.0, 10.0]),
        ];
        let anns = annotations(&faces, "");
        assert_eq!(anns[0].label, "Aigerim K (83%)");
        assert_eq!(anns[0].color, KNOWN_COLOR);
        assert_eq!(anns[1].label, UNKNOWN_LABEL);
        assert_eq!(anns[1].color, UNKNOWN_COLOR);
        assert_eq!(anns[1].region, [5.0, 5.0, 10.0, 10.0]);
    }

    #[test]
    fn test_prefix_only_on_known_faces() {
        let faces = [
            face(true, "Aigerim K", 83, [0.0, 0.0, 10.0, 10.0]),
            face(false, UNKNOWN_LABEL, 0, [5.0, 5.0, 10.0, 10.0]),
        ];
        let anns = annotations(&faces, "Сотрудник Energo University: ");
        assert_eq!(anns[0].label, "Сотрудник Energo University: Aigerim K (83%)");
        assert_eq!(anns[1].label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_band_height_is_capped_by_box() {
        let mut img = RgbImage::new(100, 100);
        let anns = [
            Annotation {
                region: [0.0, 0.0, 40.0, 60.0],
                label: "tall".into(),
                color: KNOWN_COLOR,
            },
            Annotation {
                region: [50.0, 0.0, 40.0, 12.0],
                label: "short".into(),
                color: KNOWN_COLOR,
            },
        ];
        draw_annotations(&mut img, &anns);

        let green = Rgb(KNOWN_COLOR);
        // tall box: band covers rows 40..60 only
        assert_eq!(*img.get_pixel(20, 40), green);
        assert_eq!(*img.get_pixel(20, 39), Rgb([0, 0, 0]));
        // short box: the band fills it entirely and stays inside
        assert_eq!(*img.get_pixel(70, 5), green);
        assert_eq!(*img.get_pixel(70, 12), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_outline_and_band() {
        let mut img = RgbImage::new(100, 100);
        let ann = Annotation {
            region: [10.0, 10.0, 60.0, 60.0],
            label: "x".into(),
            color: KNOWN_COLOR,
        };
        draw_annotations(&mut img, &[ann]);

        let green = Rgb(KNOWN_COLOR);
        assert_eq!(*img.get_pixel(10, 10), green);
        assert_eq!(*img.get_pixel(11, 40), green);
        assert_eq!(*img.get_pixel(69, 30), green);
        // label band at the bottom
        assert_eq!(*img.get_pixel(40, 60), green);
        // interior above the band untouched
        assert_eq!(*img.get_pixel(40, 30), Rgb([0, 0, 0]));
        // outside untouched
        assert_eq!(*img.get_pixel(70, 70), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_clips_to_image() {
        let mut img = RgbImage::new(20, 20);
        let anns = [
            Annotation {
                region: [-5.0, -5.0, 50.0, 50.0],
                label: "x".into(),
                color: UNKNOWN_COLOR,
            },
            Annotation {
                region: [30.0, 30.0, 5.0, 5.0],
                label: "off-screen".into(),
                color: KNOWN_COLOR,
            },
        ];
        draw_annotations(&mut img, &anns);
        assert_eq!(*img.get_pixel(0, 0), Rgb(UNKNOWN_COLOR));
        assert_eq!(*img.get_pixel(19, 19), Rgb(UNKNOWN_COLOR));
    }
}
