// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: (C) 2025 Cranky Kernel <crankykernel@proton.me>

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub probe: ProbeConfig,
    pub player: PlayerConfig,
    pub ui: UiConfig,
}

/// Upstream endpoints and the browser identity presented to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Schedule endpoint; `{date}` is replaced with `YYYY-MM-DD`.
    pub schedule_url: String,
    pub share_url: String,
    pub user_agent: String,
    pub referer: String,
    pub origin: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Reuse one mpv window through its IPC socket
    #[default]
    Mpv,
    /// Spawn an independent mpv per channel
    Detached,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub play_mode: PlayMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub refresh_secs: u64,
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            schedule_url: "https://web-api.scorarab.com/api/detail-matches/{date}?t=10".to_string(),
            share_url: "https://share.koora.vip/share.php".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
                .to_string(),
            referer: "https://koora.vip/".to_string(),
            origin: "https://koora.vip".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            concurrency: 8,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpv".to_string(),
            args: Vec::new(),
            play_mode: PlayMode::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_secs: 10,
            page_size: 20,
        }
    }
}

impl Config {
    /// Default location: `~/.config/matchday/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("matchday").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        if !path.as_ref().exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Could not load config file, using defaults: {:#}", e);
            Self::default()
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [probe]
            timeout_secs = 2

            [player]
            play_mode = "detached"
            "#,
        )
        .unwrap();

        assert_eq!(config.probe.timeout_secs, 2);
        assert_eq!(config.probe.concurrency, 8);
        assert_eq!(config.player.play_mode, PlayMode::Detached);
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.ui.refresh_secs, 10);
        assert!(config.source.schedule_url.contains("{date}"));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = std::env::temp_dir().join(format!("matchday-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = Config::default();
        config.source.referer = "https://example.test/".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.source.referer, "https://example.test/");
        assert_eq!(loaded.player.play_mode, PlayMode::Mpv);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load_or_default("/nonexistent/matchday/config.toml");
        assert_eq!(config.source.origin, "https://koora.vip");
    }
}
