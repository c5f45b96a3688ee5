//! Network-resource layer for the Duo JavaScript runtime.
//!
//! Multiplexes a fixed number of TCP connections behind integer socket ids and
//! drives the WiFi link lifecycle from a non-blocking per-tick `idle` step.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod logging;
pub mod runtime;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod socket;
pub mod stack;
pub mod telemetry;
pub mod types;
pub mod wifi;

pub use config::{WifiPolicy, CHUNK_SIZE, MAX_CLIENT_SOCKETS, MAX_SERVER_SOCKETS};
pub use runtime::{CallbackToken, NetEvent, NetReply, NetworkDriver, NetworkRuntime};
pub use socket::SocketMux;
pub use types::{
    Cipher, Credential, CredentialOptions, IpAddressing, Security, SocketError, SocketId,
    StaticIpConfig, StoredCredential, WifiError, WifiState,
};
pub use wifi::WifiManager;
