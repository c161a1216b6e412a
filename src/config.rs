use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{SeeDroidError, SeeDroidResult};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
    /// Role-to-model mapping. If a role is absent, falls back to active_provider defaults.
    #[serde(default)]
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider (used as fallback when no role config exists).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var SEEDROID_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Maps classifier roles to specific provider+model combinations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesConfig {
    /// Picks one candidate id out of a listing or an annotated screenshot.
    pub locator: Option<RoleEntry>,
    /// Decomposes an instruction into an action plan.
    pub planner: Option<RoleEntry>,
    /// Judges whether a condition holds on the current screen.
    pub verifier: Option<RoleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Must match a key under [llm.providers.*].
    pub provider: String,
    /// Model name sent to the API.
    pub model: String,
    /// Use SSE streaming. Classifier answers are short, so off by default.
    #[serde(default)]
    pub stream: bool,
    /// Overrides the provider-level temperature for this role.
    pub temperature: Option<f64>,
}

fn default_temperature() -> f64 {
    0.1
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// UI tree listing only.
    #[default]
    Structural,
    /// Annotated screenshot read by a vision model.
    Visual,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Structural => f.write_str("structural"),
            Strategy::Visual => f.write_str("visual"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Nodes narrower or shorter than this (px) are dropped.
    #[serde(default = "default_min_element_size")]
    pub min_element_size: i32,
    /// Nodes covering at least this share of both screen axes are dropped.
    #[serde(default = "default_background_ratio")]
    pub background_ratio: f64,
    /// Where the last annotated screenshot is written. Empty disables it.
    #[serde(default = "default_debug_image_path")]
    pub debug_image_path: String,
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_min_element_size() -> i32 {
    20
}

fn default_background_ratio() -> f64 {
    0.95
}

fn default_debug_image_path() -> String {
    "last_marked_screenshot.png".to_string()
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            min_element_size: default_min_element_size(),
            background_ratio: default_background_ratio(),
            debug_image_path: default_debug_image_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Pause after every successful step so transitions finish before the next capture.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_wait_poll_ms")]
    pub wait_poll_ms: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub default_wait_timeout_secs: f64,
    /// Delay between tapping an input field and typing into it.
    #[serde(default = "default_input_focus_ms")]
    pub input_focus_ms: u64,
    #[serde(default = "default_app_launch_ms")]
    pub app_launch_ms: u64,
    #[serde(default = "default_swipe_distance")]
    pub swipe_distance: i32,
    #[serde(default = "default_swipe_duration_ms")]
    pub swipe_duration_ms: u64,
}

fn default_settle_ms() -> u64 {
    500
}

fn default_wait_poll_ms() -> u64 {
    2000
}

fn default_wait_timeout_secs() -> f64 {
    30.0
}

fn default_input_focus_ms() -> u64 {
    500
}

fn default_app_launch_ms() -> u64 {
    2000
}

fn default_swipe_distance() -> i32 {
    300
}

fn default_swipe_duration_ms() -> u64 {
    300
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            wait_poll_ms: default_wait_poll_ms(),
            default_wait_timeout_secs: default_wait_timeout_secs(),
            input_focus_ms: default_input_focus_ms(),
            app_launch_ms: default_app_launch_ms(),
            swipe_distance: default_swipe_distance(),
            swipe_duration_ms: default_swipe_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_serial")]
    pub serial: String,
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Package used by OpenApp/CloseApp when the plan names no app.
    #[serde(default)]
    pub default_package: Option<String>,
    /// Extra human name → package entries, consulted before the built-in table.
    #[serde(default)]
    pub app_aliases: HashMap<String, String>,
}

fn default_serial() -> String {
    "127.0.0.1:16384".to_string()
}

fn default_adb_path() -> String {
    "adb".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: default_serial(),
            adb_path: default_adb_path(),
            default_package: None,
            app_aliases: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Keyword library referenced in the `*** Settings ***` header.
    #[serde(default = "default_library")]
    pub library: String,
}

fn default_library() -> String {
    "SeeDroidLibrary".to_string()
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            library: default_library(),
        }
    }
}

fn resolve_config_path() -> SeeDroidResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("seedroid").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(SeeDroidError::Config(
        "config.toml not found next to executable, in working directory or user config dir"
            .into(),
    ))
}

pub fn load_config() -> SeeDroidResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> SeeDroidResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(
        path = %path.display(),
        provider = %config.llm.active_provider,
        strategy = %config.locator.strategy,
        "config loaded"
    );
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> SeeDroidResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
