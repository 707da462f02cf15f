use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{GridPilotError, GridPilotResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var GRIDPILOT_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_temperature() -> f64 {
    0.1
}

/// Capture and click-replay settings for the target game window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Substring matched against window titles to find the game.
    #[serde(default = "default_window_title")]
    pub window_title: String,
    /// Side length of one grid cell in pixels (square cells).
    #[serde(default = "default_cell_size")]
    pub cell_size: u32,
    /// Seconds to wait after handling a frame before the next capture.
    #[serde(default = "default_screenshot_interval")]
    pub screenshot_interval_secs: u64,
    /// Seconds between consecutive clicks of one batch.
    #[serde(default = "default_click_interval")]
    pub click_interval_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_title: default_window_title(),
            cell_size: default_cell_size(),
            screenshot_interval_secs: default_screenshot_interval(),
            click_interval_secs: default_click_interval(),
        }
    }
}

fn default_window_title() -> String {
    "Maniac Mansion".to_string()
}

fn default_cell_size() -> u32 {
    40
}

fn default_screenshot_interval() -> u64 {
    3
}

fn default_click_interval() -> u64 {
    2
}

/// Viewer-suggestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Check the suggestion buffer every N loop iterations.
    #[serde(default = "default_chat_check_interval")]
    pub check_interval_iterations: u64,
    /// Suggestions older than this are never executed.
    #[serde(default = "default_chat_max_age")]
    pub max_age_minutes: i64,
    /// Frame dimensions viewer pixel commands are validated against; also
    /// bounds the cell-command range together with `game.cell_size`.
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            check_interval_iterations: default_chat_check_interval(),
            max_age_minutes: default_chat_max_age(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_true() -> bool {
    true
}

fn default_chat_check_interval() -> u64 {
    5
}

fn default_chat_max_age() -> i64 {
    5
}

fn resolve_config_path() -> GridPilotResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(GridPilotError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> GridPilotResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        window = %config.game.window_title,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> GridPilotResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_cadence() {
        let content = r#"
            [llm]
            active_provider = "local"

            [llm.providers.local]
            display_name = "Local"
            api_base = "http://localhost:11434/v1/chat/completions"
            model = "llava"
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.game.cell_size, 40);
        assert_eq!(config.game.click_interval_secs, 2);
        assert_eq!(config.chat.check_interval_iterations, 5);
        assert_eq!(config.chat.max_age_minutes, 5);
        assert!(config.chat.enabled);
    }
}
