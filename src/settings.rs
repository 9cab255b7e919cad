//! Persisted application settings (`frameweave.json`).
//!
//! Missing file → defaults. Missing fields → field defaults, so older files keep loading.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::interpolator::AnimationStyle;
use crate::motion::types::DEFAULT_CONTEXT_LENGTH;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "frameweave.json";

/// Default REST API port
pub const DEFAULT_PORT: u16 = 9841;

/// Backend configuration passed through to every interpolation request untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Model checkpoint name
    pub ckpt: String,
    pub width: u32,
    pub height: u32,
    pub image_dimension: String,
    pub output_format: String,
    pub motion_scale: f64,
    pub prompt: String,
    pub negative_prompt: String,
    /// ease-in-out | ease-in | ease-out | linear
    pub interpolation_type: String,
    pub stmfnet_multiplier: u32,
    pub relative_ipadapter_strength: f64,
    pub relative_cn_strength: f64,
    pub type_of_strength_distribution: String,
    pub linear_strength_value: String,
    pub type_of_frame_distribution: String,
    pub linear_frame_distribution_value: i64,
    pub type_of_key_frame_influence: String,
    pub linear_key_frame_influence_value: f64,
    pub normalise_speed: bool,
    pub ipadapter_noise: f64,
    pub lora_data: Vec<Value>,
    /// Any other backend keys, kept in file order
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ckpt: String::new(),
            width: 512,
            height: 512,
            image_dimension: "512x512".to_string(),
            output_format: "video/h264-mp4".to_string(),
            motion_scale: 1.0,
            prompt: String::new(),
            negative_prompt: String::new(),
            interpolation_type: "ease-in-out".to_string(),
            stmfnet_multiplier: 2,
            relative_ipadapter_strength: 1.0,
            relative_cn_strength: 0.0,
            type_of_strength_distribution: "dynamic".to_string(),
            linear_strength_value: "(0.0, 1.0)".to_string(),
            type_of_frame_distribution: "dynamic".to_string(),
            linear_frame_distribution_value: 16,
            type_of_key_frame_influence: "dynamic".to_string(),
            linear_key_frame_influence_value: 1.0,
            normalise_speed: true,
            ipadapter_noise: 0.3,
            lora_data: Vec::new(),
            extra: IndexMap::new(),
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub backend: BackendConfig,
    pub animation_style: AnimationStyle,
    /// Context window length written into every request
    pub context_length: i64,
    /// Frame index offset given to new shot sessions; requests use the buffer of their own params
    pub buffer: i64,
    /// Requests dispatched per generation
    pub variant_count: usize,
    pub queue_inference: bool,
    pub server_port: u16,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            animation_style: AnimationStyle::default(),
            context_length: DEFAULT_CONTEXT_LENGTH,
            buffer: 4,
            variant_count: 1,
            queue_inference: true,
            server_port: DEFAULT_PORT,
        }
    }
}

impl AppSettings {
    /// Load settings; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("frameweave_missing_{}.json", uuid::Uuid::new_v4()));
        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.context_length, 16);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("frameweave_settings_{}.json", uuid::Uuid::new_v4()));
        let mut settings = AppSettings::default();
        settings.backend.ckpt = "dreamshaper_8.safetensors".to_string();
        settings.backend.extra.insert("sampler".to_string(), Value::from("euler"));
        settings.variant_count = 3;

        settings.save(&path).unwrap();
        let loaded = AppSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"buffer": 8, "backend": {"width": 768}}"#).unwrap();
        assert_eq!(settings.buffer, 8);
        assert_eq!(settings.backend.width, 768);
        assert_eq!(settings.backend.height, 512);
        assert_eq!(settings.server_port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let path = std::env::temp_dir().join(format!("frameweave_bad_{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, "{ not json").unwrap();
        let err = AppSettings::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse settings"));
        let _ = fs::remove_file(&path);
    }
}
