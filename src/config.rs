//! Configuration loading, validation and saving.
//!
//! Everything lives under `~/.heartchat/`:
//! - `config.toml`: service, persona, prompt-file and chat settings
//! - `.env`: API credentials (see [`crate::credentials`])
//! - `prompts/`: steering fragment files
//! - `logs/`: rotated JSON logs

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Top-level configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Generation service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Display names.
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Steering fragment file selection.
    #[serde(default)]
    pub prompts: PromptsConfig,

    /// Chat behavior toggles.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Generation service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Model spec in `<provider>/<model>` form (e.g. "openai/gpt-4o-mini").
    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint override. For `openai` this is the full chat completions
    /// URL; for `ollama` the server base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Credential key holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Display names used in prompts and the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// The human's display name.
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// The bot's display name; also the reply label prefix.
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            bot_name: default_bot_name(),
        }
    }
}

/// Steering fragment files, relative to the prompts directory.
///
/// An absent entry selects the built-in persona line for that stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Fragment for the analysis stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_file: Option<String>,

    /// Fragment for the reply stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_file: Option<String>,
}

/// Chat behavior toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Append the full transcript to the reply-stage prompt.
    #[serde(default)]
    pub context_enabled: bool,
}

// Default value functions for serde

fn default_model() -> String {
    "openai/gpt-4o-mini".to_owned()
}
fn default_api_key_env() -> String {
    "HEARTCHAT_API_KEY".to_owned()
}
fn default_user_name() -> String {
    "User".to_owned()
}
fn default_bot_name() -> String {
    "AI".to_owned()
}

impl Config {
    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed model spec, an unparsable or
    /// non-HTTP `api_url`, or an empty display name.
    pub fn validate(&self) -> anyhow::Result<()> {
        let (provider, model) = self.service.model.split_once('/').ok_or_else(|| {
            anyhow::anyhow!(
                "invalid service.model {:?}, expected '<provider>/<model>'",
                self.service.model
            )
        })?;
        if provider.is_empty() || model.is_empty() {
            anyhow::bail!(
                "invalid service.model {:?}, both provider and model must be non-empty",
                self.service.model
            );
        }

        if let Some(raw) = &self.service.api_url {
            let parsed = url::Url::parse(raw)
                .with_context(|| format!("invalid service.api_url {raw:?}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("service.api_url must be http or https, got {raw:?}");
            }
        }

        if self.persona.user_name.trim().is_empty() || self.persona.bot_name.trim().is_empty() {
            anyhow::bail!("persona names must not be empty");
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_or_default(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        info!(path = %path.display(), "no config file found, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

/// Write config as TOML, creating the parent directory if needed.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_config(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config to {}", path.display()))?;
    Ok(())
}

/// Resolve the default config directory (`~/.heartchat/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".heartchat"))
}

/// Well-known files and directories under the config root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory.
    pub root: PathBuf,
    /// `config.toml`.
    pub config_toml: PathBuf,
    /// `.env` credentials file.
    pub env_file: PathBuf,
    /// Steering fragment directory.
    pub prompts_dir: PathBuf,
    /// Log directory.
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Layout rooted at `root`.
    pub fn under(root: PathBuf) -> Self {
        Self {
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            prompts_dir: root.join("prompts"),
            logs_dir: root.join("logs"),
            root,
        }
    }
}

/// Resolve [`RuntimePaths`] under [`config_dir`].
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(config_dir()?))
}
