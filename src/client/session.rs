//! Session token management
//!
//! The session starts unauthenticated. A successful `/login` stores the first
//! returned token, which is then reused for the lifetime of the client. There
//! is no expiry tracking, no refresh and no logout.

use super::transport::{Endpoint, Transport};
use crate::config::{ConnectionConfig, Credentials};
use crate::error::{Result, SaltError};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Whether a session token is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Where the credential presented to header-authenticated endpoints comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// The pre-issued token from the configuration
    StoredToken,
    /// A token obtained from `/login` with username and password
    Login,
}

impl AuthStrategy {
    pub fn for_config(config: &ConnectionConfig) -> Self {
        match config.credentials() {
            Credentials::Token { .. } => AuthStrategy::StoredToken,
            Credentials::Password { .. } => AuthStrategy::Login,
        }
    }
}

/// Body of a `/login` response
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "return", default)]
    pub sessions: Vec<SessionDescriptor>,
}

/// One session issued by `/login`
#[derive(Debug, Deserialize)]
pub struct SessionDescriptor {
    pub token: String,
    #[serde(default)]
    pub expire: Option<f64>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub eauth: Option<String>,
    #[serde(default)]
    pub perms: Vec<serde_json::Value>,
}

/// Owns the session token
///
/// The lock is held across the whole login round trip so concurrent callers
/// never trigger a second `/login`.
#[derive(Debug, Default)]
pub struct SessionManager {
    token: Mutex<Option<String>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> SessionState {
        if self.token.lock().await.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Log in unless a token is already held
    ///
    /// Always fails in token mode.
    pub async fn login(&self, transport: &Transport, config: &ConnectionConfig) -> Result<()> {
        login_credentials(config)?;

        let mut guard = self.token.lock().await;
        if guard.is_some() {
            debug!("Already holding a session token, skipping login");
            return Ok(());
        }

        *guard = Some(request_token(transport, config).await?);
        Ok(())
    }

    /// Credential to present on header-authenticated endpoints
    ///
    /// Token mode hands back the configured token. Password mode logs in on
    /// first use and returns the cached session token afterwards.
    pub async fn session_token(
        &self,
        transport: &Transport,
        config: &ConnectionConfig,
    ) -> Result<String> {
        if let Credentials::Token { token } = config.credentials() {
            return Ok(token.expose_secret().to_string());
        }

        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        let token = request_token(transport, config).await?;
        *guard = Some(token.clone());
        Ok(token)
    }
}

fn login_credentials(config: &ConnectionConfig) -> Result<(&str, &SecretString)> {
    match config.credentials() {
        Credentials::Token { .. } => Err(SaltError::Authentication(
            "Unable to login when configured to use a token. \
             Configure username/password to login"
                .to_string(),
        )),
        Credentials::Password { username, password } => Ok((username.as_str(), password)),
    }
}

async fn request_token(transport: &Transport, config: &ConnectionConfig) -> Result<String> {
    let (username, password) = login_credentials(config)?;

    let body = json!({
        "username": username,
        "password": password.expose_secret(),
        "eauth": config.eauth().as_str(),
    });

    debug!("Logging in to salt-api as {}", username);
    let response = transport
        .send(Method::GET, &Endpoint::Login, &body, None)
        .await
        .map_err(|e| SaltError::Authentication(format!("login failed: {}", e)))?;

    let login: LoginResponse = transport
        .decode(response)
        .await
        .map_err(|e| SaltError::Authentication(format!("login failed: {}", e)))?;

    let session = login.sessions.into_iter().next().ok_or_else(|| {
        SaltError::Authentication("Empty return from API while trying to login".to_string())
    })?;

    info!(
        user = session.user.as_deref().unwrap_or(username),
        "Logged in to salt-api"
    );
    Ok(session.token)
}
