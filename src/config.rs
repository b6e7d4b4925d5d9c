/*!
 * Connection configuration for the Salt API client
 *
 * Settings arrive loosely typed (environment, TOML, CLI flags) as
 * [`ClientSettings`]. They are turned into an immutable [`ConnectionConfig`]
 * in two strictly ordered steps: [`apply_defaults`] then [`validate`].
 * Neither step touches the network.
 */

use crate::error::{Result, SaltError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default Salt API port
pub const DEFAULT_PORT: u16 = 8000;

/// Default connection scheme
pub const DEFAULT_SCHEME: &str = "https";

/// Default external authentication backend
pub const DEFAULT_EAUTH: &str = "pam";

/// Fixed per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// External authentication backends accepted by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eauth {
    Pam,
    File,
    #[serde(rename = "sharedsecret")]
    SharedSecret,
}

impl Eauth {
    /// Every supported backend, in the order they are reported to users
    pub const ALL: [Eauth; 3] = [Eauth::Pam, Eauth::File, Eauth::SharedSecret];

    /// Backend name as sent to the Salt API
    pub fn as_str(&self) -> &'static str {
        match self {
            Eauth::Pam => "pam",
            Eauth::File => "file",
            Eauth::SharedSecret => "sharedsecret",
        }
    }
}

impl fmt::Display for Eauth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Eauth {
    type Err = SaltError;

    fn from_str(s: &str) -> Result<Self> {
        Eauth::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Eauth::ALL.iter().map(|e| e.as_str()).collect();
                SaltError::Config(format!(
                    "the Eauth type {} is not supported. The valid types are: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Username, password and eauth backend in every request body
    Password,
    /// Pre-issued token
    Token,
}

/// Mode-specific credentials; exactly one set exists per mode
#[derive(Debug)]
pub enum Credentials {
    Password {
        username: String,
        password: SecretString,
    },
    Token {
        token: SecretString,
    },
}

impl Credentials {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credentials::Password { .. } => AuthMode::Password,
            Credentials::Token { .. } => AuthMode::Token,
        }
    }
}

/// Raw connection settings as read from the environment, a file or flags
///
/// Every field is optional here; defaults and validation happen when the
/// settings are turned into a [`ConnectionConfig`].
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub eauth: Option<String>,
    pub use_token: Option<bool>,
    pub token: Option<String>,
    pub ssl_skip_verify: Option<bool>,
    pub debug: Option<bool>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("eauth", &self.eauth)
            .field("use_token", &self.use_token)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("ssl_skip_verify", &self.ssl_skip_verify)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClientSettings {
    /// Read settings from `SALTSTACK_*` environment variables
    ///
    /// Environment variables:
    /// - `SALTSTACK_HOST`, `SALTSTACK_PORT`, `SALTSTACK_SCHEME`
    /// - `SALTSTACK_USERNAME`, `SALTSTACK_PASSWORD`, `SALTSTACK_EAUTH`
    /// - `SALTSTACK_USE_TOKEN`, `SALTSTACK_TOKEN`
    /// - `SALTSTACK_SSL_SKIP_VERIFY`, `SALTSTACK_DEBUG`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let port = match var("SALTSTACK_PORT") {
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                SaltError::Config(format!("SALTSTACK_PORT is not a valid port: {}", raw))
            })?),
            None => None,
        };

        Ok(Self {
            host: var("SALTSTACK_HOST"),
            port,
            scheme: var("SALTSTACK_SCHEME"),
            username: var("SALTSTACK_USERNAME"),
            password: var("SALTSTACK_PASSWORD"),
            eauth: var("SALTSTACK_EAUTH"),
            use_token: var("SALTSTACK_USE_TOKEN")
                .map(|v| parse_flag("SALTSTACK_USE_TOKEN", &v))
                .transpose()?,
            token: var("SALTSTACK_TOKEN"),
            ssl_skip_verify: var("SALTSTACK_SSL_SKIP_VERIFY")
                .map(|v| parse_flag("SALTSTACK_SSL_SKIP_VERIFY", &v))
                .transpose()?,
            debug: var("SALTSTACK_DEBUG")
                .map(|v| parse_flag("SALTSTACK_DEBUG", &v))
                .transpose()?,
        })
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            SaltError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Overlay `other` on top of `self`; fields set in `other` win
    pub fn merge(self, other: ClientSettings) -> Self {
        Self {
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            scheme: other.scheme.or(self.scheme),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            eauth: other.eauth.or(self.eauth),
            use_token: other.use_token.or(self.use_token),
            token: other.token.or(self.token),
            ssl_skip_verify: other.ssl_skip_verify.or(self.ssl_skip_verify),
            debug: other.debug.or(self.debug),
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SaltError::Config(format!(
            "{} must be a boolean, got {}",
            name, value
        ))),
    }
}

/// Fill unset connection fields with their defaults
///
/// A port of 0 counts as unset.
pub fn apply_defaults(settings: ClientSettings) -> ClientSettings {
    ClientSettings {
        port: settings.port.filter(|p| *p != 0).or(Some(DEFAULT_PORT)),
        scheme: settings
            .scheme
            .filter(|s| !s.is_empty())
            .or_else(|| Some(DEFAULT_SCHEME.to_string())),
        eauth: settings.eauth.or_else(|| Some(DEFAULT_EAUTH.to_string())),
        use_token: settings.use_token.or(Some(false)),
        ssl_skip_verify: settings.ssl_skip_verify.or(Some(false)),
        debug: settings.debug.or(Some(false)),
        ..settings
    }
}

/// Check settings and build the immutable connection configuration
///
/// Unset fields are treated as missing; run [`apply_defaults`] first.
pub fn validate(settings: ClientSettings) -> Result<ConnectionConfig> {
    let eauth: Eauth = settings.eauth.as_deref().unwrap_or_default().parse()?;

    let host = settings
        .host
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| SaltError::Config("host is required".to_string()))?;

    let port = settings
        .port
        .filter(|p| *p != 0)
        .ok_or_else(|| SaltError::Config("port is required".to_string()))?;

    let scheme = settings
        .scheme
        .ok_or_else(|| SaltError::Config("scheme is required".to_string()))?;
    if !SUPPORTED_SCHEMES.contains(&scheme.as_str()) {
        return Err(SaltError::Config(format!(
            "the scheme {} is not supported. The valid schemes are: {}",
            scheme,
            SUPPORTED_SCHEMES.join(", ")
        )));
    }

    let credentials = if settings.use_token.unwrap_or(false) {
        let token = settings
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SaltError::Config("token is required when use_token is true".to_string()))?;
        Credentials::Token {
            token: SecretString::new(token.into_boxed_str()),
        }
    } else {
        let username = settings
            .username
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SaltError::Config("username is required".to_string()))?;
        let password = settings
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SaltError::Config("password is required".to_string()))?;
        Credentials::Password {
            username,
            password: SecretString::new(password.into_boxed_str()),
        }
    };

    let base_url = Url::parse(&format!("{}://{}:{}", scheme, host, port))
        .map_err(|e| SaltError::Config(format!("Invalid host {}: {}", host, e)))?;

    Ok(ConnectionConfig {
        host,
        port,
        scheme,
        eauth,
        credentials,
        ssl_skip_verify: settings.ssl_skip_verify.unwrap_or(false),
        debug: settings.debug.unwrap_or(false),
        base_url,
    })
}

/// Validated, immutable connection configuration
#[derive(Debug)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    scheme: String,
    eauth: Eauth,
    credentials: Credentials,
    ssl_skip_verify: bool,
    debug: bool,
    base_url: Url,
}

impl ConnectionConfig {
    /// Apply defaults, then validate
    pub fn new(settings: ClientSettings) -> Result<Self> {
        validate(apply_defaults(settings))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn eauth(&self) -> Eauth {
        self.eauth
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    pub fn ssl_skip_verify(&self) -> bool {
        self.ssl_skip_verify
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Root URL of the Salt API, e.g. `https://salt:8000/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Logging settings for the binary
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    /// Forces DEBUG regardless of `log_level`
    pub debug: bool,
}
