mod credential;
mod error;
mod socket;
mod wifi;

pub use credential::{Cipher, Credential, CredentialOptions, Password, Security, Ssid};
pub use error::{SocketError, WifiError};
pub use socket::{SocketId, SocketIdGenerator};
pub use wifi::{
    AccessPoint, AssociationStatus, IpAddressing, IpConfig, ScanResults, ScanSsid,
    StaticIpConfig, StoredCredential, StoredCredentials, WifiDetails, WifiState,
};
