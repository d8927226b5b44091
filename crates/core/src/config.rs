//! Config file parsing for `~/.config/epub-thumbnailer/config.toml`.
//!
//! Use `thumbnail_options_from_config` to turn the loaded config into the
//! options `generate_thumbnail` takes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::extract::ResizeFilter;
use crate::security::SecurityLimits;
use crate::thumbnail::{ThumbnailOptions, DEFAULT_SIZE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub filter: ResizeFilter,
}

fn default_size() -> u32 {
    DEFAULT_SIZE
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            filter: ResizeFilter::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub max_file_size_mb: Option<u64>,
    pub max_compression_ratio: Option<u64>,
    pub max_file_count: Option<u64>,
}

/// Load config from the default path. A missing or invalid file yields defaults.
pub fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => AppConfig::default(),
    }
}

pub fn load_config_from(path: &Path) -> AppConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return AppConfig::default(),
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
            AppConfig::default()
        }
    }
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("epub-thumbnailer");
        p.push("config.toml");
        p
    })
}

/// Build security limits from config. Uses defaults for any unset values.
pub fn security_limits_from_config(c: &SecurityConfig) -> SecurityLimits {
    let mut limits = SecurityLimits::default();
    if let Some(mb) = c.max_file_size_mb {
        limits.max_entry_size_bytes = mb.saturating_mul(1024).saturating_mul(1024);
    }
    if let Some(r) = c.max_compression_ratio {
        limits.max_compression_ratio = r;
    }
    if let Some(n) = c.max_file_count {
        limits.max_file_count = n;
    }
    limits
}

pub fn thumbnail_options_from_config(cfg: &AppConfig) -> ThumbnailOptions {
    ThumbnailOptions {
        size: cfg.thumbnail.size,
        filter: cfg.thumbnail.filter,
        security: security_limits_from_config(&cfg.security),
    }
}
