use core::net::Ipv4Addr;

use crate::config::{SCAN_RESULTS_MAX, STORED_CREDENTIALS_MAX, WIFI_SCAN_SSID_MAX};

use super::{Cipher, Security, Ssid, WifiError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WifiState {
    #[default]
    Off,
    On,
    Connecting,
    Connected,
}

impl WifiState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    pub const fn radio_powered(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Outcome of the last `begin_associate` call as reported by the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationStatus {
    Pending,
    Succeeded,
    Failed,
}

pub type ScanSsid = heapless::String<WIFI_SCAN_SSID_MAX>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: ScanSsid,
    pub bssid: [u8; 6],
    pub rssi: i8,
    pub channel: u8,
    pub security: Security,
    pub cipher: Cipher,
}

pub type ScanResults = heapless::Vec<AccessPoint, SCAN_RESULTS_MAX>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IpConfig {
    pub local_ip: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns_server: Ipv4Addr,
    pub dhcp_server: Ipv4Addr,
}

impl IpConfig {
    pub const UNASSIGNED: Self = Self {
        local_ip: Ipv4Addr::UNSPECIFIED,
        subnet_mask: Ipv4Addr::UNSPECIFIED,
        gateway: Ipv4Addr::UNSPECIFIED,
        dns_server: Ipv4Addr::UNSPECIFIED,
        dhcp_server: Ipv4Addr::UNSPECIFIED,
    };
}

/// How the next association obtains its address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IpAddressing {
    #[default]
    Dynamic,
    Static,
}

impl IpAddressing {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dynamic => "dhcp",
            Self::Static => "static",
        }
    }
}

/// Fixed address used instead of DHCP once `use_static_ip` is selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticIpConfig {
    pub local_ip: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns_server: Ipv4Addr,
}

impl StaticIpConfig {
    /// Host address must be unicast, the mask contiguous, and a gateway (if
    /// given) on the same subnet.
    pub fn new(
        local_ip: Ipv4Addr,
        subnet_mask: Ipv4Addr,
        gateway: Ipv4Addr,
        dns_server: Ipv4Addr,
    ) -> Result<Self, WifiError> {
        if local_ip.is_unspecified() || local_ip.is_broadcast() || local_ip.is_multicast() {
            return Err(WifiError::InvalidArgument);
        }
        let mask = u32::from(subnet_mask);
        if mask == 0 || mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(WifiError::InvalidArgument);
        }
        if !gateway.is_unspecified() && u32::from(gateway) & mask != u32::from(local_ip) & mask {
            return Err(WifiError::InvalidArgument);
        }
        Ok(Self {
            local_ip,
            subnet_mask,
            gateway,
            dns_server,
        })
    }

    pub const fn ip_config(&self) -> IpConfig {
        IpConfig {
            local_ip: self.local_ip,
            subnet_mask: self.subnet_mask,
            gateway: self.gateway,
            dns_server: self.dns_server,
            dhcp_server: Ipv4Addr::UNSPECIFIED,
        }
    }
}

/// A network the stack remembers. Passwords never leave the radio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCredential {
    pub ssid: Ssid,
    pub security: Security,
    pub cipher: Cipher,
}

pub type StoredCredentials = heapless::Vec<StoredCredential, STORED_CREDENTIALS_MAX>;

/// Status snapshot answered by `details()` in every state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WifiDetails {
    pub state: WifiState,
    pub auto_connect: bool,
    pub connect_failed: bool,
    pub retry_count: u8,
    pub has_credentials: bool,
    pub listening: bool,
    pub addressing: IpAddressing,
    pub ssid: Option<Ssid>,
    pub bssid: Option<[u8; 6]>,
    pub rssi: Option<i8>,
    pub mac: [u8; 6],
}
