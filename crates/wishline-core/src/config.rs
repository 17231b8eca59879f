//! Wishline configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WishlineConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl WishlineConfig {
    /// Load config from the default path (~/.wishline/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::WishlineError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::WishlineError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::WishlineError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Wishline home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wishline")
    }
}

/// Text-generation (LLM) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the registry endpoint when set.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    256
}
fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            endpoint: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path; empty means ~/.wishline/wishline.db.
    #[serde(default)]
    pub db_path: String,
}

impl StoreConfig {
    pub fn resolve_path(&self) -> PathBuf {
        if self.db_path.is_empty() {
            WishlineConfig::home_dir().join("wishline.db")
        } else {
            PathBuf::from(&self.db_path)
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8900
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Allowed drift between a user's send time and the trigger's wall clock.
    /// Must be at least half the trigger cadence or users fall between runs.
    #[serde(default = "default_tolerance")]
    pub window_tolerance_minutes: i64,
    /// Internal trigger cadence for `serve`; 0 = external trigger only.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Soft deadline per run; users not reached are recorded as skipped.
    /// 0 disables the deadline.
    #[serde(default)]
    pub run_deadline_secs: u64,
}

fn default_tolerance() -> i64 {
    15
}
fn default_tick_interval() -> u64 {
    900
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_tolerance_minutes: default_tolerance(),
            tick_interval_secs: default_tick_interval(),
            run_deadline_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WishlineConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.scheduler.window_tolerance_minutes, 15);
        assert_eq!(config.scheduler.tick_interval_secs, 900);
        assert_eq!(config.gateway.port, 8900);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            provider = "groq"
            model = "llama-3.1-8b-instant"

            [scheduler]
            window_tolerance_minutes = 10
            run_deadline_secs = 120
        "#;

        let config: WishlineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.scheduler.window_tolerance_minutes, 10);
        assert_eq!(config.scheduler.run_deadline_secs, 120);
        // Untouched sections keep defaults
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: WishlineConfig = toml::from_str("").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.scheduler.run_deadline_secs, 0);
    }

    #[test]
    fn test_store_path_resolution() {
        let store = StoreConfig {
            db_path: "/tmp/custom.db".into(),
        };
        assert_eq!(store.resolve_path(), PathBuf::from("/tmp/custom.db"));
        let default_store = StoreConfig::default();
        assert!(
            default_store
                .resolve_path()
                .to_string_lossy()
                .contains("wishline")
        );
    }
}
