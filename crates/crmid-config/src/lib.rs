//! Shared configuration for crmid consumers.
//!
//! TOML profiles, credential resolution (env + plaintext fallback), and
//! translation to a validated [`ConnectionScope`] — the descriptor that
//! names a backend connection and carries its cache policies. Cache
//! instances in `crmid-core` are namespaced by [`ConnectionScope::scope_key`],
//! so two profiles pointing at different organizations never share entries.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crmid_api::SchemaVersion;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    NoSuchProfile { profile: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            profiles: HashMap::new(),
        }
    }
}

/// A named backend connection profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Service endpoint (e.g., "https://crm.example.com/service.svc").
    pub service_url: String,

    /// Organization name. Required — cache instances are scoped by it.
    #[serde(default)]
    pub organization: String,

    /// Backend schema generation: "v3", "v4", or "v2011".
    pub version: SchemaVersion,

    /// Username for password auth.
    pub username: Option<String>,

    /// Password (plaintext — prefer the `CRMID_PASSWORD` env var).
    pub password: Option<String>,

    /// Environment variable name holding a bearer token.
    pub token_env: Option<String>,

    /// Bearer token (plaintext — prefer `token_env`).
    pub token: Option<String>,

    /// Per-cache-kind overrides; anything unset uses the defaults.
    #[serde(default)]
    pub caches: CacheSettings,
}

// ── Cache policies ──────────────────────────────────────────────────

/// Byte budget plus time-to-live for one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CachePolicy {
    /// Maximum total byte estimate before least-recently-used eviction.
    pub max_bytes: u64,
    /// Fixed lifetime stamped on every entry at insertion.
    pub ttl_secs: u64,
}

impl CachePolicy {
    pub fn new(max_bytes: u64, ttl_secs: u64) -> Self {
        Self { max_bytes, ttl_secs }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Policies for the five cache kinds a connection scope owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Resolved role objects.
    #[serde(default = "default_object_policy")]
    pub roles: CachePolicy,
    /// Resolved user objects.
    #[serde(default = "default_object_policy")]
    pub users: CachePolicy,
    /// "members of role" string payloads.
    #[serde(default = "default_string_policy")]
    pub members: CachePolicy,
    /// "roles of user" string payloads.
    #[serde(default = "default_string_policy")]
    pub member_of: CachePolicy,
    /// Adapted entity-type metadata.
    #[serde(default = "default_metadata_policy")]
    pub metadata: CachePolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            roles: default_object_policy(),
            users: default_object_policy(),
            members: default_string_policy(),
            member_of: default_string_policy(),
            metadata: default_metadata_policy(),
        }
    }
}

fn default_object_policy() -> CachePolicy {
    CachePolicy::new(1024 * 1024, 600)
}
fn default_string_policy() -> CachePolicy {
    CachePolicy::new(256 * 1024, 300)
}
fn default_metadata_policy() -> CachePolicy {
    CachePolicy::new(4 * 1024 * 1024, 3600)
}

// ── Resolved connection scope ───────────────────────────────────────

/// Credential material for a backend connection.
#[derive(Clone)]
pub enum AuthCredentials {
    Password {
        username: String,
        password: SecretString,
    },
    Token(SecretString),
}

impl std::fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
        }
    }
}

/// A fully validated backend connection descriptor.
///
/// Everything the core needs to select a repository stack and to derive
/// cache-instance names. Constructed only through [`resolve_scope`], which
/// enforces the organization/profile invariants up front — cache
/// construction never re-validates.
#[derive(Debug, Clone)]
pub struct ConnectionScope {
    pub profile: String,
    pub organization: String,
    pub service_url: Url,
    pub version: SchemaVersion,
    pub auth: AuthCredentials,
    pub caches: CacheSettings,
}

impl ConnectionScope {
    /// The key under which this scope's caches are registered.
    pub fn scope_key(&self) -> String {
        format!("{}:{}", self.profile, self.organization)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$CRMID_CONFIG` or `~/.config/crmid/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("CRMID_CONFIG") {
        return PathBuf::from(p);
    }
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("crmid");
    p.push("config.toml");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full [`Config`] from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load a [`Config`] from an explicit path + environment.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRMID_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Scope resolution ────────────────────────────────────────────────

/// Resolve credentials from the chain: env var named by `token_env`,
/// `CRMID_PASSWORD`, then plaintext config values.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<AuthCredentials, ConfigError> {
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(AuthCredentials::Token(SecretString::from(val)));
        }
    }

    if let Some(ref username) = profile.username {
        if let Ok(pw) = std::env::var("CRMID_PASSWORD") {
            return Ok(AuthCredentials::Password {
                username: username.clone(),
                password: SecretString::from(pw),
            });
        }
        if let Some(ref pw) = profile.password {
            return Ok(AuthCredentials::Password {
                username: username.clone(),
                password: SecretString::from(pw.clone()),
            });
        }
    }

    if let Some(ref token) = profile.token {
        return Ok(AuthCredentials::Token(SecretString::from(token.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build a validated [`ConnectionScope`] from a named profile.
///
/// This is the hard-failure point for scope misconfiguration: an absent
/// profile, an empty organization, or a bad URL is rejected here, before
/// any cache instance can be constructed for the scope.
pub fn resolve_scope(cfg: &Config, profile_name: &str) -> Result<ConnectionScope, ConfigError> {
    let profile = cfg
        .profiles
        .get(profile_name)
        .ok_or_else(|| ConfigError::NoSuchProfile {
            profile: profile_name.into(),
        })?;

    if profile.organization.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "organization".into(),
            reason: "must be non-empty; cache scoping depends on it".into(),
        });
    }

    let service_url: Url = profile
        .service_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "service_url".into(),
            reason: format!("invalid URL: {}", profile.service_url),
        })?;

    let auth = resolve_credentials(profile, profile_name)?;

    Ok(ConnectionScope {
        profile: profile_name.to_owned(),
        organization: profile.organization.clone(),
        service_url,
        version: profile.version,
        auth,
        caches: profile.caches,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_config() -> Config {
        let raw = r#"
            default_profile = "prod"

            [profiles.prod]
            service_url = "https://crm.example.com/service.svc"
            organization = "Contoso"
            version = "v2011"
            username = "svc-identity"
            password = "hunter2"

            [profiles.broken]
            service_url = "https://crm.example.com/service.svc"
            version = "v3"
            username = "svc-identity"
            password = "hunter2"

            [profiles.tuned]
            service_url = "https://crm.example.com/service.svc"
            organization = "Fabrikam"
            version = "v4"
            token = "abc123"

            [profiles.tuned.caches]
            roles = { max_bytes = 2048, ttl_secs = 5 }
        "#;
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn resolve_scope_builds_scope_key() {
        let cfg = sample_config();
        let scope = resolve_scope(&cfg, "prod").unwrap();
        assert_eq!(scope.scope_key(), "prod:Contoso");
        assert_eq!(scope.version, SchemaVersion::V2011);
    }

    #[test]
    fn empty_organization_is_a_hard_failure() {
        let cfg = sample_config();
        let err = resolve_scope(&cfg, "broken").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "organization"));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let cfg = sample_config();
        assert!(matches!(
            resolve_scope(&cfg, "nope"),
            Err(ConfigError::NoSuchProfile { .. })
        ));
    }

    #[test]
    fn cache_overrides_merge_with_defaults() {
        let cfg = sample_config();
        let scope = resolve_scope(&cfg, "tuned").unwrap();
        assert_eq!(scope.caches.roles, CachePolicy::new(2048, 5));
        // Untouched kinds keep their defaults.
        assert_eq!(scope.caches.metadata, default_metadata_policy());
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                default_profile = "lab"

                [profiles.lab]
                service_url = "https://lab.example.com/"
                organization = "Lab"
                version = "v3"
                token = "t"
            "#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("lab"));
        assert!(cfg.profiles.contains_key("lab"));
    }

    #[test]
    fn credentials_prefer_token_env() {
        // No token_env set on this profile; falls through to plaintext token.
        let cfg = sample_config();
        let auth = resolve_credentials(&cfg.profiles["tuned"], "tuned").unwrap();
        assert!(matches!(auth, AuthCredentials::Token(_)));
    }
}
