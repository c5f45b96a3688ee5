//! Capability interface of the vendor TCP/WiFi stack.
//!
//! The core never talks to the radio firmware directly. Board support code
//! implements these traits on top of the vendor API; the `sim` feature implements
//! them in memory for host tests.

use core::net::Ipv4Addr;

use crate::types::{
    AssociationStatus, Credential, IpAddressing, IpConfig, ScanResults, Ssid, StaticIpConfig,
    StoredCredentials,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackError {
    /// No progress made; retry on a later tick.
    WouldBlock,
    Closed,
    Timeout,
    Refused,
    /// Raw vendor result code for anything else.
    Other(i32),
}

pub trait TcpClient {
    fn connect(&mut self, addr: Ipv4Addr, port: u16) -> Result<(), StackError>;
    fn is_connected(&self) -> bool;
    /// Bytes ready to read without blocking.
    fn available(&self) -> usize;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StackError>;
    fn write(&mut self, data: &[u8]) -> Result<usize, StackError>;
    /// Shut the connection down. Must tolerate repeated calls.
    fn stop(&mut self);
}

pub trait TcpServer {
    type Client: TcpClient;

    fn begin(&mut self) -> Result<(), StackError>;
    /// Newly arrived connection, if any. Never blocks.
    fn accept(&mut self) -> Option<Self::Client>;
    fn stop(&mut self);
}

pub trait TcpStack {
    type Client: TcpClient;
    type Server: TcpServer<Client = Self::Client>;

    /// `None` when the stack cannot construct another handle.
    fn new_client(&mut self) -> Option<Self::Client>;
    fn new_server(&mut self, port: u16) -> Option<Self::Server>;
}

pub trait WifiRadio {
    fn power_on(&mut self);
    fn power_off(&mut self);
    /// Start joining the AP named by the stored credential. Never blocks;
    /// progress is observed through [`WifiRadio::poll_association`].
    fn begin_associate(&mut self);
    fn disassociate(&mut self);
    fn poll_association(&mut self) -> AssociationStatus;
    /// Joined and holding an address.
    fn link_up(&self) -> bool;

    fn has_credentials(&self) -> bool;
    fn set_credentials(&mut self, credential: &Credential) -> Result<(), StackError>;
    fn clear_credentials(&mut self) -> bool;
    /// Remembered networks, replacing the contents of `out`.
    fn credentials(&self, out: &mut StoredCredentials);

    /// Provisioning mode: the radio waits for a phone to hand it a credential.
    fn start_listen(&mut self);
    fn stop_listen(&mut self);
    fn is_listening(&self) -> bool;

    /// Stored by the stack; applied on the next association after `use_static_ip`.
    fn set_static_ip(&mut self, config: &StaticIpConfig);
    fn static_ip(&self) -> Option<StaticIpConfig>;
    fn use_static_ip(&mut self);
    fn use_dynamic_ip(&mut self);
    fn addressing(&self) -> IpAddressing;

    fn scan(&mut self, results: &mut ScanResults) -> Result<(), StackError>;
    /// Number of echo replies received out of `tries`.
    fn ping(&mut self, addr: Ipv4Addr, tries: u8) -> u32;
    fn resolve(&mut self, hostname: &str) -> Option<Ipv4Addr>;

    fn ip_config(&self) -> IpConfig;
    fn ssid(&self) -> Option<Ssid>;
    /// Hardware address of the joined AP.
    fn bssid(&self) -> Option<[u8; 6]>;
    fn rssi(&self) -> i8;
    fn mac_address(&self) -> [u8; 6];

    /// One-shot hook run once per successful association.
    fn post_connect(&mut self) {}
}

/// Name lookup offered by the WiFi layer.
pub trait HostResolver {
    fn resolve_host(&mut self, hostname: &str) -> Option<Ipv4Addr>;
}
