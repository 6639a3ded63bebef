//! Configuration vault – reads/writes `~/.tabby/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroize;

use tabby_runtime::{CatConfig, LlmTreeGenerator};
use tabby_types::GridBounds;

/// Persisted user configuration stored in `~/.tabby/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Send free-text commands to the tree generator.
    #[serde(default = "default_generator_enabled")]
    pub generator_enabled: bool,

    /// Base URL of the OpenAI-compatible endpoint (Ollama by default).
    #[serde(default = "default_llm_url")]
    pub llm_url: String,

    /// Model asked to rewrite the tree.
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token for hosted endpoints (stored as plain text – the file is
    /// written owner-only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Seconds to wait for the model before giving up on a command.
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Simulation ticks per wall-clock second.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,

    /// Fixed RNG seed; omit for a different cat every run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default = "default_grid_width")]
    pub grid_width: i32,

    #[serde(default = "default_grid_height")]
    pub grid_height: i32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("generator_enabled", &self.generator_enabled)
            .field("llm_url", &self.llm_url)
            .field("model", &self.model)
            .field(
                "api_key",
                if self.api_key.is_empty() { &"<not set>" } else { &"<redacted>" },
            )
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("tick_hz", &self.tick_hz)
            .field("seed", &self.seed)
            .field("grid_width", &self.grid_width)
            .field("grid_height", &self.grid_height)
            .finish()
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

fn default_generator_enabled() -> bool {
    true
}
fn default_llm_url() -> String {
    LlmTreeGenerator::DEFAULT_URL.to_string()
}
fn default_model() -> String {
    LlmTreeGenerator::DEFAULT_MODEL.to_string()
}
fn default_llm_timeout_secs() -> u64 {
    LlmTreeGenerator::DEFAULT_TIMEOUT.as_secs()
}
fn default_tick_hz() -> f64 {
    10.0
}
fn default_grid_width() -> i32 {
    80
}
fn default_grid_height() -> i32 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generator_enabled: default_generator_enabled(),
            llm_url: default_llm_url(),
            model: default_model(),
            api_key: String::new(),
            llm_timeout_secs: default_llm_timeout_secs(),
            tick_hz: default_tick_hz(),
            seed: None,
            grid_width: default_grid_width(),
            grid_height: default_grid_height(),
        }
    }
}

impl Config {
    /// Wall-clock time between two ticks.  Rates outside `(0, 120]` fall
    /// back to the default.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz.is_finite() && self.tick_hz > 0.0 && self.tick_hz <= 120.0 {
            self.tick_hz
        } else {
            default_tick_hz()
        };
        Duration::from_secs_f64(1.0 / hz)
    }

    /// The cat spawns in the middle of the configured grid.
    pub fn cat_config(&self) -> CatConfig {
        let bounds = GridBounds::new(self.grid_width, self.grid_height);
        CatConfig {
            spawn: bounds.center(),
            bounds,
            seed: self.seed,
        }
    }

    /// The tree generator, or `None` when free text is disabled.
    pub fn generator(&self) -> Option<LlmTreeGenerator> {
        if !self.generator_enabled {
            return None;
        }
        let timeout = Duration::from_secs(self.llm_timeout_secs.max(1));
        let generator = LlmTreeGenerator::new(self.llm_url.clone(), self.model.clone())
            .with_timeout(timeout);
        if self.api_key.is_empty() {
            Some(generator)
        } else {
            Some(generator.with_api_key(self.api_key.clone()))
        }
    }
}

/// Return the path to `~/.tabby/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".tabby").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `TABBY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TABBY_LLM_URL` | `llm_url` |
/// | `TABBY_MODEL` | `model` |
/// | `TABBY_API_KEY` | `api_key` |
/// | `TABBY_TICK_HZ` | `tick_hz` |
/// | `TABBY_SEED` | `seed` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TABBY_LLM_URL") {
        cfg.llm_url = v;
    }
    if let Ok(v) = std::env::var("TABBY_MODEL") {
        cfg.model = v;
    }
    if let Ok(v) = std::env::var("TABBY_API_KEY") {
        cfg.api_key = v;
    }
    if let Ok(v) = std::env::var("TABBY_TICK_HZ")
        && let Ok(hz) = v.parse::<f64>()
    {
        cfg.tick_hz = hz;
    }
    if let Ok(v) = std::env::var("TABBY_SEED")
        && let Ok(seed) = v.parse::<u64>()
    {
        cfg.seed = Some(seed);
    }
}

/// Save the config to disk, creating `~/.tabby/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
