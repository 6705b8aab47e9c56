use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::matcher::DEFAULT_THRESHOLD;
use faceroll_vision::model::{ModelPaths, DETECTOR_FILE, RECOGNIZER_FILE};

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("", "", "faceroll"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACEROLL_CONFIG_PATH") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("faceroll.toml")),
});

pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACEROLL_DATA_DIR") {
    Some(path) => PathBuf::from(path),
    None => PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum embedding distance still accepted as a match.
    pub threshold: f32,
    /// Gallery file written by `build` and read by `recognize`.
    pub gallery: PathBuf,
    /// Directory of enrollment photos named `<person>_<anything>.<ext>`.
    pub dataset: PathBuf,
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
    /// Minimum detector score for a face.
    pub score_threshold: f32,
    /// IoU above which overlapping detections are merged.
    pub nms_threshold: f32,
    pub camera: String,
    /// Frames dropped before the still is taken.
    pub warmup_frames: usize,
    /// Text put in front of a known person's name on annotations.
    pub label_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        let models = DATA_DIR.join("models");
        Self {
            threshold: DEFAULT_THRESHOLD,
            gallery: DATA_DIR.join("gallery.bin"),
            dataset: PathBuf::from("dataset"),
            detector_model: models.join(DETECTOR_FILE),
            recognizer_model: models.join(RECOGNIZER_FILE),
            score_threshold: 0.6,
            nms_threshold: 0.3,
            camera: "/dev/video0".to_string(),
            warmup_frames: 4,
            label_prefix: String::new(),
        }
    }
}

impl Config {
    pub fn models(&self) -> ModelPaths {
        ModelPaths {
            detector: self.detector_model.clone(),
            recognizer: self.recognizer_model.clone(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("faceroll-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("config.toml")
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config(Some(&scratch())).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.threshold, 0.6);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let path = scratch();
        std::fs::write(
            &path,
            "threshold = 0.45\ncamera = \"/dev/video2\"\nlabel_prefix = \"Staff: \"\n",
        )
        .unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.threshold, 0.45);
        assert_eq!(cfg.camera, "/dev/video2");
        assert_eq!(cfg.label_prefix, "Staff: ");
        assert_eq!(cfg.nms_threshold, 0.3);
        assert_eq!(cfg.gallery, Config::default().gallery);
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch();
        let cfg = Config {
            threshold: 0.5,
            dataset: PathBuf::from("/srv/faces"),
            warmup_frames: 0,
            ..Config::default()
        };
        save_config(&cfg, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), cfg);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let path = scratch();
        std::fs::write(&path, "threshold = \"high\"").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }
}
