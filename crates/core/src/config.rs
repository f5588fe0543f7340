//! TOML-based configuration system for the ELOG service.
//!
//! Sensitive values (the token signing key, the LDAP bind password) are
//! stored as `_env` fields that reference environment variable names. The
//! actual secrets are resolved at runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::token::MAX_TTL_SECS;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Listener, logging and data directory settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bearer token settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Person / group directory settings.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Attachment cleanup task settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener and process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/elog")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerConfig {
    /// Path of the SQLite database inside `data_dir`.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("elog.db")
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Bearer token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the HS256 signing key.
    #[serde(default = "default_jwt_key_env")]
    pub jwt_key_env: String,

    /// Lifetime of issued tokens in seconds (default one hour).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// Resolved signing key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub jwt_key: Option<String>,
}

fn default_jwt_key_env() -> String {
    "ELOG_JWT_KEY".into()
}
fn default_token_ttl() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_key_env: default_jwt_key_env(),
            token_ttl_secs: default_token_ttl(),
            jwt_key: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Person / group directory configuration.
///
/// LDAP is used when both `url` and `base_dn` are set. Otherwise a static
/// TOML directory file is used if configured, and lookups return nothing
/// when neither is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP server URL (e.g. `ldaps://ldap.example.com`).
    #[serde(default)]
    pub url: Option<String>,

    /// LDAP search base DN.
    #[serde(default)]
    pub base_dn: Option<String>,

    /// LDAP bind DN for authenticated queries. Anonymous when unset.
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Environment variable holding the LDAP bind password.
    #[serde(default)]
    pub bind_password_env: Option<String>,

    /// Organizational unit holding person entries, relative to `base_dn`.
    #[serde(default = "default_people_ou")]
    pub people_ou: String,

    /// Organizational unit holding group entries, relative to `base_dn`.
    #[serde(default = "default_groups_ou")]
    pub groups_ou: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_ldap_timeout")]
    pub timeout_secs: u64,

    /// Path to a static TOML directory used when LDAP is not configured.
    #[serde(default)]
    pub static_file: Option<PathBuf>,

    /// Resolved LDAP bind password.
    #[serde(skip)]
    pub bind_password: Option<String>,
}

fn default_people_ou() -> String {
    "ou=people".into()
}
fn default_groups_ou() -> String {
    "ou=groups".into()
}
fn default_ldap_timeout() -> u64 {
    5
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: None,
            base_dn: None,
            bind_dn: None,
            bind_password_env: None,
            people_ou: default_people_ou(),
            groups_ou: default_groups_ou(),
            timeout_secs: default_ldap_timeout(),
            static_file: None,
            bind_password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

/// Scheduled attachment cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Whether the cleanup task is scheduled at all.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between cleanup runs.
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,

    /// Age in minutes after which an unreferenced attachment is considered unused.
    #[serde(default = "default_unused_after")]
    pub unused_after_mins: u64,
}

fn default_cleanup_interval() -> u64 {
    3600
}
fn default_unused_after() -> u64 {
    60
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_cleanup_interval(),
            unused_after_mins: default_unused_after(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables.
    ///
    /// Missing variables log a warning but do not fail; callers decide
    /// which secrets their execution mode requires.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.auth.jwt_key = resolve_optional_env(&self.auth.jwt_key_env, "auth.jwt_key_env");

        if let Some(ref env_name) = self.directory.bind_password_env {
            self.directory.bind_password =
                resolve_optional_env(env_name, "directory.bind_password_env");
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".into(),
                detail: "listen address must not be empty".into(),
            });
        }
        if self.auth.token_ttl_secs == 0 || self.auth.token_ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_ttl_secs".into(),
                detail: format!("token lifetime must be between 1 and {} seconds", MAX_TTL_SECS),
            });
        }
        if self.directory.url.is_some() != self.directory.base_dn.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "directory.base_dn".into(),
                detail: "url and base_dn must be set together".into(),
            });
        }
        if self.cleanup.enabled && self.cleanup.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.interval_secs".into(),
                detail: "cleanup interval must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[server]
listen = "0.0.0.0:9090"
log_level = "debug"
data_dir = "/tmp/elog"

[auth]
jwt_key_env = "ELOG_TEST_KEY"
token_ttl_secs = 600

[directory]
url = "ldaps://ldap.example.com"
base_dn = "dc=example,dc=com"
bind_dn = "cn=reader,dc=example,dc=com"
bind_password_env = "ELOG_LDAP_PASSWORD"
people_ou = "ou=users"

[cleanup]
enabled = true
interval_secs = 120
unused_after_mins = 30
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.listen, "0.0.0.0:9090");
        assert_eq!(config.auth.token_ttl_secs, 600);
        assert_eq!(config.directory.url.as_deref(), Some("ldaps://ldap.example.com"));
        assert_eq!(config.directory.people_ou, "ou=users");
        assert_eq!(config.directory.groups_ou, "ou=groups");
        assert!(config.cleanup.enabled);
        assert_eq!(config.cleanup.unused_after_mins, 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(
            config.server.database_path(),
            PathBuf::from("/tmp/elog/elog.db")
        );
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/elog.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.auth.jwt_key_env, "ELOG_JWT_KEY");
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert!(config.directory.url.is_none());
        assert!(!config.cleanup.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.auth.token_ttl_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "auth.token_ttl_secs"
        ));
    }

    #[test]
    fn test_validate_bounds_ttl() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.auth.token_ttl_secs = MAX_TTL_SECS;
        assert!(config.validate().is_ok());

        config.auth.token_ttl_secs = MAX_TTL_SECS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "auth.token_ttl_secs"
        ));

        config.auth.token_ttl_secs = 1_000_000_000_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_url_without_base_dn() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.directory.base_dn = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "directory.base_dn"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("ELOG_TEST_KEY", "k3y");
        std::env::set_var("ELOG_LDAP_PASSWORD", "s3cret");

        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.auth.jwt_key.as_deref(), Some("k3y"));
        assert_eq!(config.directory.bind_password.as_deref(), Some("s3cret"));

        std::env::remove_var("ELOG_TEST_KEY");
        std::env::remove_var("ELOG_LDAP_PASSWORD");
    }
}
