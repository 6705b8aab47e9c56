use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::gallery::{Gallery, GalleryEntry};
use crate::storage;
use faceroll_vision::FaceEncoder;

/// File extensions accepted as enrollment photos (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Outcome of one gallery build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GalleryStats {
    /// Image files looked at.
    pub scanned: usize,
    pub enrolled: usize,
    /// Images in which no face was found.
    pub no_face: usize,
    /// Images that could not be decoded or encoded.
    pub failed: usize,
    /// Distinct people in the written gallery.
    pub people: usize,
}

/// Display name encoded in an enrollment file name.
///
/// The name is the part before the first `_` (the whole file name when there
/// is none), with `-` and `.` read as spaces and every word title-cased:
/// `aigerim-k_01.jpg` becomes `Aigerim K`, `aigerim.jpg` becomes `Aigerim Jpg`.
pub fn person_name(file_name: &str) -> String {
    let raw = file_name.split('_').next().unwrap_or(file_name);

    let mut name = String::with_capacity(raw.len());
    let mut in_word = false;
    for ch in raw.chars() {
        let ch = if ch == '-' || ch == '.' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if in_word {
                name.extend(ch.to_lowercase());
            } else {
                name.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            name.push(ch);
            in_word = false;
        }
    }
    name
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

/// Image files of `dir`, sorted by file name.
fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(dir.to_path_buf()),
        _ => Error::io(dir, e),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && is_image(&path) {
                    files.push(path);
                }
            }
            Err(e) => warn!("skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }
    files.sort();
    Ok(files)
}

/// First face embedding of the photo at `path`.
fn enroll_file<E: FaceEncoder>(encoder: &mut E, path: &Path) -> Result<Vec<f32>> {
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    encoder
        .face_embeddings(&img)
        .map_err(Error::Vision)?
        .into_iter()
        .next()
        .map(|embedding| embedding.values)
        .ok_or_else(|| Error::ExtractionEmpty(path.to_path_buf()))
}

/// Enroll every photo in `image_dir` and write the gallery to `output`.
///
/// A photo that fails only costs its own entry; the build fails when the
/// directory cannot be listed or the gallery cannot be written.
pub fn build_gallery<E: FaceEncoder>(
    encoder: &mut E,
    image_dir: &Path,
    output: &Path,
) -> Result<GalleryStats> {
    let files = image_files(image_dir)?;
    info!("Found {} image(s) in {}", files.len(), image_dir.display());

    let mut stats = GalleryStats::default();
    let mut entries = Vec::with_capacity(files.len());

    for path in files {
        stats.scanned += 1;
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping {}: file name is not UTF-8", path.display());
            stats.failed += 1;
            continue;
        };
        let name = person_name(file_name);

        match enroll_file(encoder, &path) {
            Ok(embedding) => {
                info!("Enrolled {} as {}", path.display(), name);
                entries.push(GalleryEntry::new(name, embedding));
                stats.enrolled += 1;
            }
            Err(Error::ExtractionEmpty(_)) => {
                warn!("No face found in {}, skipping", path.display());
                stats.no_face += 1;
            }
            Err(e) if e.is_per_item() => {
                warn!("Failed to process {}: {}", path.display(), e);
                stats.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    let gallery = Gallery::from_entries(entries);
    stats.people = gallery.people().len();
    storage::save_gallery(output, &gallery)?;
    info!(
        "Saved {} face(s) of {} people to {}",
        gallery.len(),
        stats.people,
        output.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_name_before_underscore() {
        assert_eq!(person_name("Aigerim-K_01.jpg"), "Aigerim K");
        assert_eq!(person_name("bauyrzhan_2_front.png"), "Bauyrzhan");
        assert_eq!(person_name("a.b-c_x.jpeg"), "A B C");
    }

    #[test]
    fn test_person_name_title_cases_words() {
        assert_eq!(person_name("JOHN-mcdonald_1.jpg"), "John Mcdonald");
        assert_eq!(person_name("айгерим-к_1.jpg"), "Айгерим К");
        assert_eq!(person_name("agent007x_1.png"), "Agent007X");
    }

    #[test]
    fn test_person_name_without_underscore_keeps_extension() {
        assert_eq!(person_name("aigerim.jpg"), "Aigerim Jpg");
        assert_eq!(person_name("ivan-petrov.PNG"), "Ivan Petrov Png");
        assert_eq!(person_name("_1.jpg"), "");
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a_1.jpg")));
        assert!(is_image(Path::new("a_1.JPEG")));
        assert!(is_image(Path::new("dir/a_1.Png")));
        assert!(!is_image(Path::new("a_1.gif")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("jpg")));
    }
}
