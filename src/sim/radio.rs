use core::net::Ipv4Addr;

use heapless::Vec;

use crate::{
    config::{HOSTNAME_MAX, SCAN_RESULTS_MAX},
    stack::{StackError, WifiRadio},
    types::{
        AccessPoint, AssociationStatus, Cipher, Credential, IpAddressing, IpConfig, Password,
        ScanResults, ScanSsid, Security, Ssid, StaticIpConfig, StoredCredential,
        StoredCredentials,
    },
};

use super::tcp::SIM_HOSTS_MAX;

pub type SimHostname = heapless::String<HOSTNAME_MAX>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimRadioCalls {
    pub power_on: u32,
    pub power_off: u32,
    pub associate: u32,
    pub disassociate: u32,
    pub post_connect: u32,
}

/// Scripted radio: associations succeed only against a visible AP whose
/// stored password matches, after `associate_delay_polls` pending polls.
#[derive(Debug)]
pub struct SimRadio {
    pub powered: bool,
    pub credential: Option<Credential>,
    pub access_points: ScanResults,
    /// Password each visible AP accepts, indexed like `access_points`.
    pub passwords: Vec<Password, SCAN_RESULTS_MAX>,
    pub associate_delay_polls: u8,
    /// Keep reporting `Pending` forever.
    pub associate_stalls: bool,
    pub hosts: Vec<(SimHostname, Ipv4Addr), SIM_HOSTS_MAX>,
    pub pingable: Vec<Ipv4Addr, SIM_HOSTS_MAX>,
    pub ip: IpConfig,
    pub mac: [u8; 6],
    pub rssi: i8,
    pub fail_scan: bool,
    pub reject_credentials: bool,
    pub listening: bool,
    pub static_ip: Option<StaticIpConfig>,
    pub addressing: IpAddressing,
    pub calls: SimRadioCalls,
    association: Option<AssociationStatus>,
    pending_polls: u8,
    associated: bool,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            powered: false,
            credential: None,
            access_points: ScanResults::new(),
            passwords: Vec::new(),
            associate_delay_polls: 0,
            associate_stalls: false,
            hosts: Vec::new(),
            pingable: Vec::new(),
            ip: IpConfig {
                local_ip: Ipv4Addr::new(192, 168, 1, 40),
                subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
                gateway: Ipv4Addr::new(192, 168, 1, 1),
                dns_server: Ipv4Addr::new(192, 168, 1, 1),
                dhcp_server: Ipv4Addr::new(192, 168, 1, 1),
            },
            mac: [0x44, 0x39, 0xc4, 0x00, 0x00, 0x01],
            rssi: -52,
            fail_scan: false,
            reject_credentials: false,
            listening: false,
            static_ip: None,
            addressing: IpAddressing::Dynamic,
            calls: SimRadioCalls::default(),
            association: None,
            pending_polls: 0,
            associated: false,
        }
    }

    /// Makes an AP visible to scans and joinable with `password`.
    pub fn add_access_point(&mut self, ssid: &str, password: &str, security: Security) {
        let Ok(ssid) = ScanSsid::try_from(ssid) else {
            return;
        };
        let Ok(password) = Password::try_from(password) else {
            return;
        };
        let index = self.access_points.len();
        let access_point = AccessPoint {
            ssid,
            bssid: [0x02, 0x00, 0x00, 0x00, 0x00, index as u8],
            rssi: -40 - index as i8,
            channel: 1 + (index as u8 % 11),
            security,
            cipher: match security {
                Security::Unsecured | Security::Wep => Cipher::NotSet,
                Security::Wpa => Cipher::Tkip,
                Security::Wpa2 => Cipher::Aes,
            },
        };
        if self.access_points.push(access_point).is_ok() {
            let _ = self.passwords.push(password);
        }
    }

    pub fn add_host(&mut self, hostname: &str, addr: Ipv4Addr) {
        if let Ok(hostname) = SimHostname::try_from(hostname) {
            let _ = self.hosts.push((hostname, addr));
        }
    }

    /// Simulates the AP going away underneath an established link.
    pub fn drop_link(&mut self) {
        self.associated = false;
        self.association = None;
    }

    pub fn is_associated(&self) -> bool {
        self.associated
    }

    /// Hands the radio a credential the way a phone app does in listening
    /// mode. Ignored unless listening; listening ends on receipt.
    pub fn provision(&mut self, credential: Credential) -> bool {
        if !self.listening {
            return false;
        }
        self.credential = Some(credential);
        self.listening = false;
        true
    }

    fn matching_access_point(&self) -> Option<&AccessPoint> {
        let credential = self.credential.as_ref()?;
        self.access_points
            .iter()
            .zip(self.passwords.iter())
            .find(|(ap, password)| {
                ap.ssid.as_str() == credential.ssid.as_str()
                    && password.as_str() == credential.password.as_str()
            })
            .map(|(ap, _)| ap)
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiRadio for SimRadio {
    fn power_on(&mut self) {
        self.calls.power_on += 1;
        self.powered = true;
    }

    fn power_off(&mut self) {
        self.calls.power_off += 1;
        self.powered = false;
        self.listening = false;
        self.associated = false;
        self.association = None;
    }

    fn begin_associate(&mut self) {
        self.calls.associate += 1;
        self.associated = false;
        self.pending_polls = self.associate_delay_polls;
        self.association = Some(AssociationStatus::Pending);
    }

    fn disassociate(&mut self) {
        self.calls.disassociate += 1;
        self.associated = false;
        self.association = None;
    }

    fn poll_association(&mut self) -> AssociationStatus {
        let Some(status) = self.association else {
            return AssociationStatus::Failed;
        };
        if status != AssociationStatus::Pending {
            return status;
        }
        if self.associate_stalls {
            return AssociationStatus::Pending;
        }
        if self.pending_polls > 0 {
            self.pending_polls -= 1;
            return AssociationStatus::Pending;
        }
        let status = if self.powered && self.matching_access_point().is_some() {
            self.associated = true;
            AssociationStatus::Succeeded
        } else {
            AssociationStatus::Failed
        };
        self.association = Some(status);
        status
    }

    fn link_up(&self) -> bool {
        self.powered && self.associated
    }

    fn has_credentials(&self) -> bool {
        self.credential.is_some()
    }

    fn set_credentials(&mut self, credential: &Credential) -> Result<(), StackError> {
        if self.reject_credentials {
            return Err(StackError::Other(-1));
        }
        self.credential = Some(credential.clone());
        Ok(())
    }

    fn clear_credentials(&mut self) -> bool {
        self.credential.take().is_some()
    }

    fn credentials(&self, out: &mut StoredCredentials) {
        out.clear();
        if let Some(credential) = self.credential.as_ref() {
            let _ = out.push(StoredCredential {
                ssid: credential.ssid.clone(),
                security: credential.security,
                cipher: credential.cipher,
            });
        }
    }

    fn start_listen(&mut self) {
        self.listening = true;
    }

    fn stop_listen(&mut self) {
        self.listening = false;
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn set_static_ip(&mut self, config: &StaticIpConfig) {
        self.static_ip = Some(*config);
    }

    fn static_ip(&self) -> Option<StaticIpConfig> {
        self.static_ip
    }

    fn use_static_ip(&mut self) {
        self.addressing = IpAddressing::Static;
    }

    fn use_dynamic_ip(&mut self) {
        self.addressing = IpAddressing::Dynamic;
    }

    fn addressing(&self) -> IpAddressing {
        self.addressing
    }

    fn scan(&mut self, results: &mut ScanResults) -> Result<(), StackError> {
        if self.fail_scan || !self.powered {
            return Err(StackError::Other(-1));
        }
        results.clear();
        for ap in self.access_points.iter() {
            if results.push(ap.clone()).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn ping(&mut self, addr: Ipv4Addr, tries: u8) -> u32 {
        if self.link_up() && self.pingable.contains(&addr) {
            u32::from(tries)
        } else {
            0
        }
    }

    fn resolve(&mut self, hostname: &str) -> Option<Ipv4Addr> {
        if !self.link_up() {
            return None;
        }
        self.hosts
            .iter()
            .find(|(name, _)| name.as_str().eq_ignore_ascii_case(hostname))
            .map(|(_, addr)| *addr)
    }

    fn ip_config(&self) -> IpConfig {
        if !self.link_up() {
            return IpConfig::UNASSIGNED;
        }
        match (self.addressing, self.static_ip) {
            (IpAddressing::Static, Some(config)) => config.ip_config(),
            _ => self.ip,
        }
    }

    fn ssid(&self) -> Option<Ssid> {
        if !self.link_up() {
            return None;
        }
        self.credential.as_ref().map(|credential| credential.ssid.clone())
    }

    fn bssid(&self) -> Option<[u8; 6]> {
        if !self.link_up() {
            return None;
        }
        self.matching_access_point().map(|ap| ap.bssid)
    }

    fn rssi(&self) -> i8 {
        if self.link_up() {
            self.rssi
        } else {
            0
        }
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    fn post_connect(&mut self) {
        self.calls.post_connect += 1;
    }
}
