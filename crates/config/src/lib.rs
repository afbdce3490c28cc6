use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TOKEN_ENV: &str = "SENTRY_AUTH_TOKEN";

/// Represents the full client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Load configuration from the provided path or the default config file.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Unable to read config file at {}", path.display()))?;

        serde_yaml::from_str(&raw)
            .with_context(|| format!("Malformed YAML in config file {}", path.display()))
    }

    /// Persist the configuration to disk, creating parent directories if needed.
    pub fn save<P: AsRef<Path>>(&self, path: Option<P>) -> Result<()> {
        let path = path
            .map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(Config::default_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let serialized = serde_yaml::to_string(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Unable to write config file {}", path.display()))?;

        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Returns either the requested profile or falls back to the default one,
    /// then to any profile at all.
    pub fn resolve_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Option<(&'a str, &'a Profile)> {
        if let Some(name) = requested {
            self.profiles.get(name).map(|profile| (name, profile))
        } else if let Some(default_name) = self.default_profile.as_deref() {
            self.profiles
                .get(default_name)
                .map(|profile| (default_name, profile))
        } else {
            self.profiles
                .iter()
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(name, profile)| (name.as_str(), profile))
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".sentry-api");
        path.push("config.yaml");
        path
    }
}

/// One Sentry installation plus the credentials to talk to it. Every value
/// is optional so a profile can rely on environment variables and defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Profile {
    /// API root, for example `https://sentry.io/api/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Organization slug used when a command needs one and none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Treat `base_url` as a self-hosted host root and append `api/`.
    #[serde(default)]
    pub on_premise: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_attempts: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl Profile {
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }
}

/// Name of the per-profile token variable, e.g. `SENTRY_AUTH_TOKEN_SELF_HOSTED`
/// for profile `self-hosted`.
pub fn profile_token_env(profile_name: &str) -> String {
    let suffix: String = profile_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{TOKEN_ENV}_{suffix}")
}

/// Find the auth token for a profile from the process environment.
pub fn resolve_token(profile_name: &str, profile: Option<&Profile>) -> Option<String> {
    resolve_token_with(profile_name, profile, |key| env::var(key).ok())
}

/// Token lookup order: the profile's own variable, the shared variable, then
/// the value stored in the profile. Empty values are skipped.
pub fn resolve_token_with<F>(
    profile_name: &str,
    profile: Option<&Profile>,
    lookup: F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let per_profile = profile_token_env(profile_name);
    if let Some(token) = lookup(&per_profile).filter(|t| !t.is_empty()) {
        debug!(source = %per_profile, "Using token from environment");
        return Some(token);
    }
    if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.is_empty()) {
        debug!(source = TOKEN_ENV, "Using token from environment");
        return Some(token);
    }
    profile
        .and_then(|profile| profile.auth_token.clone())
        .filter(|t| !t.is_empty())
}
