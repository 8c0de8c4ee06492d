use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{ModelKind, TrackParams};

const DEFAULT_DATA_ROOT: &str = "temp_data";
const TESTING_DATA_ROOT: &str = "temp_data/test_data";
const DEFAULT_MODEL: &str = "nano";
const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_IOU: f64 = 0.5;
const DEFAULT_TRACKER: &str = "bytetrack.yaml";

/// Deployment profile; selects where run artifacts are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Development,
    Testing,
    Production,
}

impl Profile {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "testing" | "test" => Ok(Profile::Testing),
            "production" | "prod" => Ok(Profile::Production),
            other => Err(anyhow!(
                "unknown profile '{}' (expected development, testing or production)",
                other
            )),
        }
    }

    fn data_root(&self) -> &'static str {
        match self {
            Profile::Testing => TESTING_DATA_ROOT,
            Profile::Development | Profile::Production => DEFAULT_DATA_ROOT,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct DigestConfigFile {
    profile: Option<String>,
    image_dir: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
    tracking: Option<TrackingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    model: Option<String>,
    confidence: Option<f64>,
    iou: Option<f64>,
    classes: Option<Vec<i64>>,
    tracker: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub profile: Profile,
    pub image_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub tracking: TrackingSettings,
}

#[derive(Debug, Clone)]
pub struct TrackingSettings {
    pub model: ModelKind,
    pub params: TrackParams,
}

impl DigestConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DIGEST_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DigestConfigFile) -> Result<Self> {
        let profile = match std::env::var("DIGEST_ENV").ok().or(file.profile) {
            Some(name) => Profile::parse(&name)?,
            None => Profile::Production,
        };
        let root = PathBuf::from(profile.data_root());
        let tracking = file.tracking.unwrap_or_default();
        let defaults = TrackParams::default();
        Ok(Self {
            profile,
            image_dir: file.image_dir.unwrap_or_else(|| root.join("images")),
            csv_dir: file.csv_dir.unwrap_or_else(|| root.join("csvs")),
            labels_path: file.labels_path,
            font_path: file.font_path,
            tracking: TrackingSettings {
                model: ModelKind::from_name(tracking.model.as_deref().unwrap_or(DEFAULT_MODEL)),
                params: TrackParams {
                    confidence: tracking.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                    iou: tracking.iou.unwrap_or(DEFAULT_IOU),
                    classes: tracking.classes.unwrap_or(defaults.classes),
                    tracker: tracking
                        .tracker
                        .unwrap_or_else(|| DEFAULT_TRACKER.to_string()),
                },
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("DIGEST_IMAGE_DIR") {
            if !dir.trim().is_empty() {
                self.image_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("DIGEST_CSV_DIR") {
            if !dir.trim().is_empty() {
                self.csv_dir = PathBuf::from(dir);
            }
        }
        if let Ok(path) = std::env::var("DIGEST_FONT_PATH") {
            if !path.trim().is_empty() {
                self.font_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(model) = std::env::var("DIGEST_MODEL") {
            if !model.trim().is_empty() {
                self.tracking.model = ModelKind::from_name(&model);
            }
        }
        if let Ok(classes) = std::env::var("DIGEST_CLASSES") {
            let parsed = split_csv(&classes)
                .iter()
                .map(|entry| {
                    entry
                        .parse::<i64>()
                        .map_err(|_| anyhow!("DIGEST_CLASSES must be a comma-separated list of class ids"))
                })
                .collect::<Result<Vec<_>>>()?;
            if !parsed.is_empty() {
                self.tracking.params.classes = parsed;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let params = &self.tracking.params;
        if !(0.0..=1.0).contains(&params.confidence) {
            return Err(anyhow!("tracking confidence must be within 0..=1"));
        }
        if !(0.0..=1.0).contains(&params.iou) {
            return Err(anyhow!("tracking iou must be within 0..=1"));
        }
        if params.classes.iter().any(|&class| class < 0) {
            return Err(anyhow!("class ids must be non-negative"));
        }
        self.tracking.params.classes.sort_unstable();
        self.tracking.params.classes.dedup();
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DigestConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: DigestConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
