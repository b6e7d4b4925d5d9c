/*!
 * minion-keys - Salt minion key pair management over salt-api
 *
 * Drives the salt-api HTTP control endpoint to manage accepted minion key
 * pairs:
 * - Validated connection configuration (password or token authentication)
 * - Lazily acquired, reused session tokens
 * - Create / read / delete / import of minion key pairs through wheel calls
 * - Structured errors for remote failures and id conflicts
 * - PEM checks for the returned RSA key material
 */

pub mod client;
pub mod config;
pub mod error;
pub mod keycheck;
pub mod keypair;
pub mod logging;

// Re-export commonly used types
pub use client::{AuthStrategy, Endpoint, SaltClient, SessionState};
pub use config::{AuthMode, ClientSettings, ConnectionConfig, Eauth};
pub use error::{Result, SaltError};
pub use keypair::{KeyPairManager, KeyPairResource, KeyPairState, ReadOutcome, DEFAULT_KEY_SIZE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
