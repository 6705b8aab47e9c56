use std::io::ErrorKind;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gallery::{Gallery, GalleryEntry};

/// On-disk layout: two parallel sequences of equal length.
#[derive(Debug, Default, Serialize, Deserialize)]
struct GalleryFile {
    names: Vec<String>,
    encodings: Vec<Vec<f32>>,
}

impl From<&Gallery> for GalleryFile {
    fn from(gallery: &Gallery) -> Self {
        let (names, encodings) = gallery
            .iter()
            .map(|e| (e.name.clone(), e.embedding.clone()))
            .unzip();
        Self { names, encodings }
    }
}

pub fn save_gallery(path: &Path, gallery: &Gallery) -> Result<()> {
    // Strings and float vectors always serialize; the error stays typed anyway.
    let data = postcard::to_allocvec(&GalleryFile::from(gallery)).map_err(|e| Error::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    std::fs::write(path, data).map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub fn load_gallery(path: &Path) -> Result<Gallery> {
    let data = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::io(path, e),
    })?;
    let corrupt = |reason: String| Error::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let (file, rest): (GalleryFile, _) =
        postcard::take_from_bytes(&data).map_err(|e| corrupt(e.to_string()))?;
    if !rest.is_empty() {
        return Err(corrupt(format!("{} trailing bytes", rest.len())));
    }
    if file.names.len() != file.encodings.len() {
        return Err(corrupt(format!(
            "{} names but {} encodings",
            file.names.len(),
            file.encodings.len()
        )));
    }

    Ok(file
        .names
        .into_iter()
        .zip(file.encodings)
        .map(|(name, embedding)| GalleryEntry { name, embedding })
        .collect())
}

/// Like [`load_gallery`], but a missing file means "nobody is known yet".
/// Corruption and other I/O errors still propagate.
pub fn load_gallery_or_empty(path: &Path) -> Result<Gallery> {
    match load_gallery(path) {
        Err(Error::NotFound(path)) => {
            warn!(
                "gallery {} not found, every face will be reported as unknown",
                path.display()
            );
            Ok(Gallery::default())
        }
        other => other,
    }
}
