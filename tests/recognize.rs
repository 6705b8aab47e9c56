mod common;

use common::{color_embedding, solid, ColorEncoder, BLUE};
use faceroll::annotate::{annotations, KNOWN_COLOR, UNKNOWN_COLOR};
use faceroll::recognize::recognize;
use faceroll::{Error, Gallery, GalleryEntry, UNKNOWN_LABEL};

fn gallery() -> Gallery {
    Gallery::from_entries(vec![
        GalleryEntry::new("Aigerim", color_embedding([250, 10, 10])),
        GalleryEntry::new("Bauyrzhan", color_embedding([10, 250, 10])),
    ])
}

#[test]
fn test_known_face_is_named() {
    let faces = recognize(
        &mut ColorEncoder::default(),
        &gallery(),
        &solid([10, 250, 10]),
        0.6,
    )
    .unwrap();

    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].region, [0.0, 0.0, 32.0, 24.0]);
    assert!(faces[0].result.matched);
    assert_eq!(faces[0].result.name, "Bauyrzhan");
    assert_eq!(faces[0].result.confidence, 100);

    let anns = annotations(&faces, "");
    assert_eq!(anns[0].label, "Bauyrzhan (100%)");
    assert_eq!(anns[0].color, KNOWN_COLOR);
}

#[test]
fn test_empty_gallery_reports_unknown() {
    let faces = recognize(
        &mut ColorEncoder::default(),
        &Gallery::default(),
        &solid([250, 10, 10]),
        0.6,
    )
    .unwrap();

    assert_eq!(faces.len(), 1);
    assert!(!faces[0].result.matched);
    assert_eq!(faces[0].result.name, UNKNOWN_LABEL);
    assert_eq!(faces[0].result.confidence, 0);
    assert_eq!(annotations(&faces, "Staff: ")[0].color, UNKNOWN_COLOR);
}

#[test]
fn test_no_face_gives_no_matches() {
    let faces = recognize(
        &mut ColorEncoder::default(),
        &gallery(),
        &solid([0, 0, 0]),
        0.6,
    )
    .unwrap();
    assert!(faces.is_empty());
}

#[test]
fn test_encoder_failure_is_reported() {
    let err = recognize(&mut ColorEncoder::default(), &gallery(), &solid(BLUE), 0.6).unwrap_err();
    assert!(matches!(err, Error::Vision(_)));
    assert!(err.to_string().contains("encoder exploded"));
}

#[test]
fn test_json_shape() {
    let faces = recognize(
        &mut ColorEncoder::default(),
        &gallery(),
        &solid([250, 10, 10]),
        0.6,
    )
    .unwrap();
    let json = serde_json::to_value(&faces).unwrap();
    let face = &json[0];
    assert_eq!(face["name"], "Aigerim");
    assert_eq!(face["matched"], true);
    assert_eq!(face["confidence"], 100);
    assert_eq!(face["region"][2], 32.0);
}
