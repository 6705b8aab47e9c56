use std::path::PathBuf;

use thiserror::Error;

/// Failures of the gallery and matching core.
#[derive(Error, Debug)]
pub enum Error {
    /// Gallery file or input directory is missing.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The encoder found no face in an image.
    #[error("no face found in {}", .0.display())]
    ExtractionEmpty(PathBuf),
    /// The gallery file exists but does not decode.
    #[error("corrupt gallery {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
    /// The gallery could not be serialized.
    #[error("encoding gallery {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
    #[error("i/o on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// The face detection/embedding pipeline failed.
    #[error("face pipeline: {0:#}")]
    Vision(anyhow::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure is limited to one item and a batch may carry on.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::ExtractionEmpty(_) | Self::Image { .. } | Self::Vision(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_item_errors() {
        assert!(Error::ExtractionEmpty(PathBuf::from("a_1.jpg")).is_per_item());
        assert!(Error::Vision(anyhow::anyhow!("boom")).is_per_item());
        assert!(!Error::NotFound(PathBuf::from("gallery.bin")).is_per_item());
        assert!(!Error::Encode {
            path: PathBuf::from("gallery.bin"),
            reason: "x".into(),
        }
        .is_per_item());
    }

    #[test]
    fn test_encode_names_the_gallery() {
        let err = Error::Encode {
            path: PathBuf::from("/data/gallery.bin"),
            reason: "buffer full".into(),
        };
        assert_eq!(
            err.to_string(),
            "encoding gallery /data/gallery.bin: buffer full"
        );
        assert!(!matches!(err, Error::Io { .. }));
    }
}
