//! Minion key pair lifecycle
//!
//! Creates, reads and deletes accepted minion key pairs through the wheel
//! `key.*` functions of salt-api, and reconciles the local resource with what
//! the master actually holds.
//!
//! ```text
//! Absent --create--> Creating --> Present --delete--> Deleting --> Absent
//!                        |            |
//!                        +-- conflict +-- read finds nothing --> Absent
//! ```
//!
//! There is no update: changing `minion_id` or `key_size` means delete and
//! create again.

pub mod types;

pub use types::{
    validate_minion_id, GeneratedKeys, KeyPairResource, KeyPairState, PrintedKeys, ReadOutcome,
    WheelResponse, DEFAULT_KEY_SIZE,
};

use crate::client::{Endpoint, SaltClient};
use crate::error::{Result, SaltError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const WHEEL_CLIENT: &str = "wheel";
const FUN_GEN_ACCEPT: &str = "key.gen_accept";
const FUN_PRINT: &str = "key.print";
const FUN_DELETE: &str = "key.delete";

fn wheel_call(fun: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("client".into(), Value::from(WHEEL_CLIENT));
    params.insert("fun".into(), Value::from(fun));
    params
}

/// Key pair operations against one salt master
#[derive(Debug, Clone)]
pub struct KeyPairManager {
    client: Arc<SaltClient>,
}

impl KeyPairManager {
    pub fn new(client: Arc<SaltClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SaltClient {
        &self.client
    }

    /// Generate and accept a key pair for `minion_id`
    ///
    /// Fails with [`SaltError::ResourceConflict`] if the master already has a
    /// key for this id. On success the resource is read back before it is
    /// returned, so its public key is what `key.print` reports. A failed
    /// read-back is logged and the resource is returned as generated.
    pub async fn create(&self, minion_id: &str, key_size: u32) -> Result<KeyPairResource> {
        validate_minion_id(minion_id)?;

        let mut resource = KeyPairResource::new(minion_id, key_size);
        resource.state = KeyPairState::Creating;

        let mut params = wheel_call(FUN_GEN_ACCEPT);
        params.insert("id_".into(), Value::from(minion_id));
        params.insert("keysize".into(), Value::from(key_size));

        debug!("Creating key pair for minion {}", minion_id);
        let response: WheelResponse = self.client.post(&Endpoint::Run, params).await?;
        let mut keys: GeneratedKeys = response.into_result(FUN_GEN_ACCEPT)?;

        if keys.is_empty() {
            return Err(SaltError::ResourceConflict {
                minion_id: minion_id.to_string(),
            });
        }

        resource.public_key = keys.remove("pub");
        resource.private_key = keys.remove("priv");
        resource.id = Some(minion_id.to_string());
        resource.state = KeyPairState::Present;
        info!("Created key pair for minion {}", minion_id);

        // The private key is only ever returned by gen_accept
        if let Err(e) = self.read(&mut resource).await {
            warn!(
                "Created key pair for minion {} but could not read it back: {}",
                minion_id, e
            );
        }
        Ok(resource)
    }

    /// Refresh `resource` from the master
    ///
    /// Only the public key and identity are refreshed. When the master no
    /// longer holds the key, the resource identity is cleared and
    /// [`ReadOutcome::Absent`] is returned. `key.print` matches by glob, so the id is checked first to
    /// keep the match to exactly one minion.
    pub async fn read(&self, resource: &mut KeyPairResource) -> Result<ReadOutcome> {
        validate_minion_id(&resource.minion_id)?;

        let mut params = wheel_call(FUN_PRINT);
        params.insert("match".into(), Value::from(resource.minion_id.as_str()));

        let response: WheelResponse = self.client.post(&Endpoint::Run, params).await?;
        let mut printed: PrintedKeys = response.into_result(FUN_PRINT)?;

        match printed.minions.remove(&resource.minion_id) {
            Some(public_key) => {
                resource.public_key = Some(public_key);
                resource.id = Some(resource.minion_id.clone());
                resource.state = KeyPairState::Present;
                Ok(ReadOutcome::Present)
            }
            None => {
                warn!(
                    "Key pair for minion {} no longer exists on the master",
                    resource.minion_id
                );
                resource.mark_absent();
                Ok(ReadOutcome::Absent)
            }
        }
    }

    /// Delete the key pair for `resource`
    ///
    /// No existence check is made first; deleting an absent key succeeds.
    pub async fn delete(&self, resource: &mut KeyPairResource) -> Result<()> {
        validate_minion_id(&resource.minion_id)?;

        let previous = resource.state;
        resource.state = KeyPairState::Deleting;

        let mut params = wheel_call(FUN_DELETE);
        params.insert("match".into(), Value::from(resource.minion_id.as_str()));

        debug!("Deleting key pair for minion {}", resource.minion_id);
        if let Err(e) = self.client.post_discard(&Endpoint::Run, params).await {
            resource.state = previous;
            return Err(e);
        }

        resource.mark_absent();
        info!("Deleted key pair for minion {}", resource.minion_id);
        Ok(())
    }

    /// Adopt an existing key pair by minion id
    ///
    /// Returns `None` if the master holds no accepted key for it. The private
    /// key of an imported pair is unknown.
    pub async fn import(&self, minion_id: &str) -> Result<Option<KeyPairResource>> {
        validate_minion_id(minion_id)?;

        let mut resource = KeyPairResource::existing(minion_id);
        match self.read(&mut resource).await? {
            ReadOutcome::Present => Ok(Some(resource)),
            ReadOutcome::Absent => Ok(None),
        }
    }
}
