use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::PLACEHOLDER_PHOTO;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    #[serde(default = "default_upload_root")]
    pub upload_root: PathBuf,
    /// Hard ceiling on buffered upload size. Uploads are held entirely in
    /// memory, so an unbounded size would be a denial-of-service vector.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            max_upload_bytes: default_max_upload_bytes(),
            placeholder: default_placeholder(),
        }
    }
}

fn default_upload_root() -> PathBuf {
    PathBuf::from("./public/uploads")
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_placeholder() -> String {
    PLACEHOLDER_PHOTO.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: i64,
    #[serde(default = "default_near_limit")]
    pub near_limit: i64,
    /// Maximum radius for proximity queries, in meters.
    #[serde(default = "default_near_max_distance_m")]
    pub near_max_distance_m: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            near_limit: default_near_limit(),
            near_max_distance_m: default_near_max_distance_m(),
        }
    }
}

fn default_search_limit() -> i64 {
    5
}
fn default_near_limit() -> i64 {
    10
}
fn default_near_max_distance_m() -> f64 {
    10_000.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.discovery.search_limit < 1 {
        anyhow::bail!("discovery.search_limit must be >= 1");
    }
    if config.discovery.near_limit < 1 {
        anyhow::bail!("discovery.near_limit must be >= 1");
    }
    if !(config.discovery.near_max_distance_m > 0.0) {
        anyhow::bail!("discovery.near_max_distance_m must be > 0");
    }
    if config.media.max_upload_bytes == 0 {
        anyhow::bail!("media.max_upload_bytes must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("storemap.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn defaults_applied() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "./data/storemap.sqlite"

[server]
bind = "127.0.0.1:7440"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discovery.search_limit, 5);
        assert_eq!(cfg.discovery.near_limit, 10);
        assert_eq!(cfg.discovery.near_max_distance_m, 10_000.0);
        assert_eq!(cfg.media.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.media.placeholder, "store.png");
    }

    #[test]
    fn zero_limit_rejected() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "./data/storemap.sqlite"

[discovery]
search_limit = 0

[server]
bind = "127.0.0.1:7440"
"#,
        );
        assert!(load_config(&path).is_err());
    }
}
