//! Key pair resource model and wheel response envelopes

use crate::error::{Result, SaltError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Key size requested when none is given
pub const DEFAULT_KEY_SIZE: u32 = 2048;

static MINION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").unwrap());

/// Check that a minion id is RFC1123-hostname safe
pub fn validate_minion_id(minion_id: &str) -> Result<()> {
    if MINION_ID_PATTERN.is_match(minion_id) {
        Ok(())
    } else {
        Err(SaltError::InvalidMinionId(minion_id.to_string()))
    }
}

/// Lifecycle state of a key pair resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPairState {
    Absent,
    Creating,
    Present,
    Deleting,
}

/// Result of reading a resource back from the master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The minion key is accepted on the master; the public key was refreshed
    Present,
    /// The minion key is gone; local identity has been cleared
    Absent,
}

/// One minion's accepted key pair
///
/// `minion_id` and `key_size` never change after creation. `private_key` is
/// only known when this process created the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairResource {
    /// Orchestrator identity, `None` once the pair no longer exists
    pub id: Option<String>,
    pub minion_id: String,
    pub key_size: u32,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub state: KeyPairState,
}

impl KeyPairResource {
    /// A resource that has not been created yet
    pub fn new(minion_id: impl Into<String>, key_size: u32) -> Self {
        Self {
            id: None,
            minion_id: minion_id.into(),
            key_size,
            public_key: None,
            private_key: None,
            state: KeyPairState::Absent,
        }
    }

    /// A resource known only by identifier, as after an import
    pub fn existing(minion_id: impl Into<String>) -> Self {
        let minion_id = minion_id.into();
        Self {
            id: Some(minion_id.clone()),
            minion_id,
            key_size: DEFAULT_KEY_SIZE,
            public_key: None,
            private_key: None,
            state: KeyPairState::Present,
        }
    }

    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn mark_absent(&mut self) {
        self.id = None;
        self.state = KeyPairState::Absent;
    }
}

/// `{"return": [{"data": {"return": ..., "success": ...}}]}` as returned by
/// wheel calls on `/run`
#[derive(Debug, Deserialize)]
pub struct WheelResponse {
    #[serde(rename = "return")]
    pub entries: Vec<WheelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WheelEntry {
    pub data: WheelData,
}

/// The payload shape depends on `fun`, so it stays raw until the outcome is known
#[derive(Debug, Deserialize)]
pub struct WheelData {
    #[serde(rename = "return", default)]
    pub result: Value,
    #[serde(default)]
    pub success: Option<bool>,
}

impl WheelResponse {
    /// Decode the payload of the first entry
    ///
    /// A call the master reports as failed becomes [`SaltError::WheelFailed`]
    /// carrying the master's own message.
    pub fn into_result<T: DeserializeOwned>(self, fun: &str) -> Result<T> {
        let data = self
            .entries
            .into_iter()
            .next()
            .map(|entry| entry.data)
            .ok_or_else(|| SaltError::MalformedResponse(format!("empty return from {}", fun)))?;

        if data.success == Some(false) {
            let message = match data.result {
                Value::String(text) => text,
                other => other.to_string(),
            };
            return Err(SaltError::WheelFailed {
                fun: fun.to_string(),
                message,
            });
        }

        Ok(serde_json::from_value(data.result)?)
    }
}

/// `key.gen_accept` payload: `{"pub": ..., "priv": ...}`, empty if the id is taken
pub type GeneratedKeys = HashMap<String, String>;

/// `key.print` payload
#[derive(Debug, Default, Deserialize)]
pub struct PrintedKeys {
    /// Accepted minion id -> public key; the field is omitted when nothing matches
    #[serde(default)]
    pub minions: HashMap<String, String>,
}
