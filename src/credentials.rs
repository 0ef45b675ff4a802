//! API key lookup for the generation service.
//!
//! Keys come from `~/.heartchat/.env` first and the process environment
//! second. The file must not be readable by group or others.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::config::{RuntimePaths, ServiceConfig};

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The runtime `.env` file.
    EnvFile,
    /// The process environment.
    Process,
}

/// Key/value pairs read from the runtime `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Wrap an existing map (tests and embedding).
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Value defined in the `.env` file for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Non-blank value for `key` and where it was found.
    pub fn lookup(&self, key: &str) -> Option<(String, KeySource)> {
        let from_file = self
            .get(key)
            .map(|value| (value.to_owned(), KeySource::EnvFile));
        from_file
            .or_else(|| {
                std::env::var(key)
                    .ok()
                    .map(|value| (value, KeySource::Process))
            })
            .filter(|(value, _)| !value.trim().is_empty())
    }

    /// Non-blank value for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when neither the file nor the environment sets it.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.lookup(key)
            .map(|(value, _)| value)
            .ok_or_else(|| anyhow::anyhow!("missing required credential: {key}"))
    }

    /// API key named by `service.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is unset or blank.
    pub fn api_key_for(&self, service: &ServiceConfig) -> anyhow::Result<String> {
        let (value, source) = self.lookup(&service.api_key_env).ok_or_else(|| {
            anyhow::anyhow!(
                "no API key for {}: set {} in .env or the environment",
                service.model,
                service.api_key_env
            )
        })?;
        debug!(key = %service.api_key_env, ?source, "resolved API key");
        Ok(value)
    }
}

/// Parse a `.env` file after checking its permissions.
///
/// # Errors
///
/// Returns an error if the file is missing, too widely readable, or
/// malformed.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    ensure_private(path)?;

    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;
    let vars = entries
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("malformed entry in credentials file {}", path.display()))?;
    Ok(Credentials { vars })
}

/// Credentials for a runtime directory; an absent `.env` yields none.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be loaded.
pub fn load_runtime_credentials(paths: &RuntimePaths) -> anyhow::Result<Credentials> {
    if !paths.env_file.exists() {
        debug!(path = %paths.env_file.display(), "no .env file, using process environment");
        return Ok(Credentials::default());
    }
    load_credentials(&paths.env_file)
}

#[cfg(unix)]
fn ensure_private(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)
        .with_context(|| format!("credentials file {} is not accessible", path.display()))?
        .permissions()
        .mode()
        & 0o777;
    if mode & 0o077 != 0 {
        anyhow::bail!(
            "credentials file {} must be 0600, found {mode:o}",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_private(path: &Path) -> anyhow::Result<()> {
    std::fs::metadata(path)
        .with_context(|| format!("credentials file {} is not accessible", path.display()))?;
    Ok(())
}
