//! HTTP transport to the Salt API
//!
//! Sends JSON bodies to salt-api endpoints, turns non-success statuses into
//! [`SaltError::Remote`] and decodes response bodies.

use crate::config::{ConnectionConfig, REQUEST_TIMEOUT};
use crate::error::{Result, SaltError};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

/// Header carrying a session token on non-`/run` endpoints
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// salt-api endpoints the client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `/run`: stateless execution, credentials travel in the body
    Run,
    /// `/`: lowstate execution, authenticated by header token
    Root,
    /// `/login`
    Login,
    /// Any other path, authenticated like [`Endpoint::Root`]
    Path(String),
}

impl Endpoint {
    pub fn path(&self) -> &str {
        match self {
            Endpoint::Run => "/run",
            Endpoint::Root => "/",
            Endpoint::Login => "/login",
            Endpoint::Path(p) => p,
        }
    }

    /// Whether credentials go in the body rather than a header
    pub fn is_run(&self) -> bool {
        matches!(self, Endpoint::Run)
    }
}

/// Merge caller parameters over the authentication payload
///
/// Keys present in both keep the caller's value.
pub fn merge_params(auth: Map<String, Value>, params: Map<String, Value>) -> Map<String, Value> {
    let mut body = auth;
    body.extend(params);
    body
}

/// Thin wrapper over a `reqwest::Client` bound to one salt-api base URL
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: Url,
    debug: bool,
}

impl Transport {
    /// Build the HTTP client with the fixed timeout and TLS policy
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.ssl_skip_verify())
            .build()
            .map_err(|e| SaltError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url().clone(),
            debug: config.debug(),
        })
    }

    fn url(&self, endpoint: &Endpoint) -> Result<Url> {
        self.base_url.join(endpoint.path()).map_err(|e| {
            SaltError::Config(format!("Invalid endpoint {}: {}", endpoint.path(), e))
        })
    }

    /// Send a JSON body and return the response if its status is success
    ///
    /// The body of a non-success response is not read.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: &Value,
        auth_token: Option<&str>,
    ) -> Result<Response> {
        let url = self.url(endpoint)?;
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(body);

        if let Some(token) = auth_token {
            request = request.header(AUTH_TOKEN_HEADER, token);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} returned {}", endpoint.path(), status);
            return Err(SaltError::remote(status));
        }

        Ok(response)
    }

    /// Read the whole body, then decode it into `T`
    pub async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        if self.debug {
            debug!(body = %String::from_utf8_lossy(&bytes), "salt-api response");
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read and drop the body
    pub async fn discard(&self, response: Response) -> Result<()> {
        let bytes = response.bytes().await?;
        if self.debug {
            debug!(body = %String::from_utf8_lossy(&bytes), "salt-api response (ignored)");
        }
        Ok(())
    }
}
