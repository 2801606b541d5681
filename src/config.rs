//! Application configuration: a YAML file overlaid with `OXR_*` variables.
//!
//! ```yaml
//! http:
//!   addr: "127.0.0.1:5555"
//!   max_body_bytes: 16384
//!   request_id_header: true
//! security:
//!   jwt_secret: "..."
//!   token_ttl_secs: 3600
//! static_files:
//!   dir: "./public"
//!   mount: "/static"
//! templates:
//!   dir: "./templates"
//! ```
//!
//! Every field is optional. Environment variables win over the file:
//! `OXR_ADDR`, `OXR_MAX_BODY_BYTES`, `OXR_JWT_SECRET`, `OXR_STATIC_DIR`,
//! `OXR_TEMPLATE_DIR`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_yaml::Error },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config '{}': {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config '{}': {source}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub security: SecurityConfig,
    pub static_files: StaticFilesConfig,
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address
    pub addr: String,
    /// Requests with a larger body are answered with 413
    pub max_body_bytes: usize,
    /// Echo `x-request-id` on every response
    pub request_id_header: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5555".to_string(),
            max_body_bytes: 16 * 1024,
            request_id_header: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    /// Lifetime of issued tokens; tokens never expire when unset
    pub token_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub dir: Option<PathBuf>,
    pub mount: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            mount: "/static".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatesConfig {
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// `Parse` when the YAML is malformed or has wrongly typed fields.
    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Parse` when it is malformed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, path)
    }

    /// Load `path` (or defaults), apply the environment and validate.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from reading, overriding or validating.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `OXR_*` values obtained through `lookup`.
    ///
    /// # Errors
    ///
    /// `Invalid` when `OXR_MAX_BODY_BYTES` is not a number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("OXR_ADDR") {
            self.http.addr = addr;
        }
        if let Some(raw) = lookup("OXR_MAX_BODY_BYTES") {
            self.http.max_body_bytes = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("OXR_MAX_BODY_BYTES '{raw}' is not a number"))
            })?;
        }
        if let Some(secret) = lookup("OXR_JWT_SECRET") {
            self.security.jwt_secret = secret;
        }
        if let Some(dir) = lookup("OXR_STATIC_DIR") {
            self.static_files.dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("OXR_TEMPLATE_DIR") {
            self.templates.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Invalid` for an unparsable address, a zero body limit, an empty
    /// secret or a mount that is not an absolute path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "http.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "security.jwt_secret must be set (or OXR_JWT_SECRET)".to_string(),
            ));
        }
        if !self.static_files.mount.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "static_files.mount '{}' must start with '/'",
                self.static_files.mount
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// `Invalid` when `http.addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.http.addr.parse().map_err(|_| {
            ConfigError::Invalid(format!("http.addr '{}' is not a socket address", self.http.addr))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_secret() -> AppConfig {
        let mut c = AppConfig::default();
        c.security.jwt_secret = "s3cret".into();
        c
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let c = AppConfig::from_yaml_str(
            "http:\n  addr: \"0.0.0.0:8080\"\nsecurity:\n  jwt_secret: abc\n",
            Path::new("inline.yaml"),
        )
        .unwrap();
        assert_eq!(c.http.addr, "0.0.0.0:8080");
        assert_eq!(c.http.max_body_bytes, 16 * 1024);
        assert_eq!(c.static_files.mount, "/static");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = AppConfig::from_yaml_str("http: [1, 2", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("OXR_ADDR", "127.0.0.1:9000"),
            ("OXR_MAX_BODY_BYTES", "1024"),
            ("OXR_JWT_SECRET", "from-env"),
            ("OXR_STATIC_DIR", "/srv/www"),
        ]
        .into_iter()
        .collect();
        let mut c = AppConfig::default();
        c.apply_overrides(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(c.http.addr, "127.0.0.1:9000");
        assert_eq!(c.http.max_body_bytes, 1024);
        assert_eq!(c.security.jwt_secret, "from-env");
        assert_eq!(c.static_files.dir, Some(PathBuf::from("/srv/www")));
        assert_eq!(c.templates.dir, None);
    }

    #[test]
    fn test_bad_body_limit_override() {
        let mut c = AppConfig::default();
        let err = c
            .apply_overrides(|k| (k == "OXR_MAX_BODY_BYTES").then(|| "big".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validation() {
        assert!(AppConfig::default().validate().is_err());
        assert!(with_secret().validate().is_ok());

        let mut c = with_secret();
        c.http.addr = "nowhere".into();
        assert!(c.validate().is_err());

        let mut c = with_secret();
        c.http.max_body_bytes = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxrouter.yaml");
        std::fs::write(&path, "security:\n  jwt_secret: filesecret\n").unwrap();
        let c = AppConfig::from_file(&path).unwrap();
        assert_eq!(c.security.jwt_secret, "filesecret");
        assert!(matches!(
            AppConfig::from_file(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
