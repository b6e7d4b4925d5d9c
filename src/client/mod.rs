//! Authenticated salt-api client
//!
//! [`SaltClient`] owns one validated [`ConnectionConfig`], one HTTP transport
//! and one session. Share a single instance (behind an `Arc`) across all
//! operations for a given configuration.
//!
//! # Example
//!
//! ```no_run
//! use minion_keys::{ClientSettings, ConnectionConfig, Endpoint, SaltClient};
//! use serde_json::{Map, Value};
//!
//! # async fn example() -> minion_keys::Result<()> {
//! let config = ConnectionConfig::new(ClientSettings::from_env()?)?;
//! let client = SaltClient::new(config)?;
//!
//! let mut params = Map::new();
//! params.insert("client".into(), Value::from("wheel"));
//! params.insert("fun".into(), Value::from("key.list_all"));
//! let keys: Value = client.post(&Endpoint::Run, params).await?;
//! # Ok(())
//! # }
//! ```

pub mod session;
pub mod transport;

pub use session::{AuthStrategy, LoginResponse, SessionDescriptor, SessionManager, SessionState};
pub use transport::{merge_params, Endpoint, Transport, AUTH_TOKEN_HEADER};

use crate::config::{AuthMode, ConnectionConfig, Credentials};
use crate::error::Result;
use reqwest::{Method, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Client for the salt-api control endpoint
#[derive(Debug)]
pub struct SaltClient {
    config: ConnectionConfig,
    transport: Transport,
    session: SessionManager,
}

impl SaltClient {
    /// Create a client; performs no network activity
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        Ok(Self {
            config,
            transport,
            session: SessionManager::new(),
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.config.auth_mode()
    }

    pub fn auth_strategy(&self) -> AuthStrategy {
        AuthStrategy::for_config(&self.config)
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Log in with username and password
    ///
    /// A no-op while a session token is held. Fails with
    /// [`SaltError::Authentication`](crate::SaltError::Authentication) in
    /// token mode.
    pub async fn login(&self) -> Result<()> {
        self.session.login(&self.transport, &self.config).await
    }

    /// Make sure a session credential is available, logging in if needed
    pub async fn ensure_authenticated(&self) -> Result<()> {
        self.session_token().await.map(|_| ())
    }

    /// Credential presented on header-authenticated endpoints
    pub async fn session_token(&self) -> Result<String> {
        self.session
            .session_token(&self.transport, &self.config)
            .await
    }

    /// POST `params` to `endpoint` and decode the JSON response into `T`
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        params: Map<String, Value>,
    ) -> Result<T> {
        let response = self.send_post(endpoint, params).await?;
        self.transport.decode(response).await
    }

    /// POST `params` to `endpoint`, ignoring the response body
    pub async fn post_discard(&self, endpoint: &Endpoint, params: Map<String, Value>) -> Result<()> {
        let response = self.send_post(endpoint, params).await?;
        self.transport.discard(response).await
    }

    async fn send_post(&self, endpoint: &Endpoint, params: Map<String, Value>) -> Result<Response> {
        let mut auth = Map::new();
        let mut header_token = None;

        match self.config.credentials() {
            Credentials::Token { token } => {
                if endpoint.is_run() {
                    auth.insert("token".into(), Value::from(token.expose_secret()));
                } else {
                    header_token = Some(self.session_token().await?);
                }
            }
            Credentials::Password { username, password } => {
                auth.insert("username".into(), Value::from(username.as_str()));
                auth.insert("password".into(), Value::from(password.expose_secret()));
                auth.insert("eauth".into(), Value::from(self.config.eauth().as_str()));
            }
        }

        if let Some(fun) = params.get("fun").and_then(Value::as_str) {
            debug!("Calling {} on {}", fun, endpoint.path());
        }

        let body = Value::Object(merge_params(auth, params));
        self.transport
            .send(Method::POST, endpoint, &body, header_token.as_deref())
            .await
    }
}
