use core::str::FromStr;

use crate::config::{WIFI_PASSWORD_MAX, WIFI_SSID_MAX};

use super::WifiError;

pub type Ssid = heapless::String<WIFI_SSID_MAX>;
pub type Password = heapless::String<WIFI_PASSWORD_MAX>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Security {
    #[default]
    Unsecured,
    Wep,
    Wpa,
    Wpa2,
}

impl Security {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unsecured => "UNSEC",
            Self::Wep => "WEP",
            Self::Wpa => "WPA",
            Self::Wpa2 => "WPA2",
        }
    }
}

impl FromStr for Security {
    type Err = WifiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("UNSEC")
            || value.eq_ignore_ascii_case("NONE")
            || value.eq_ignore_ascii_case("OPEN")
        {
            Ok(Self::Unsecured)
        } else if value.eq_ignore_ascii_case("WEP") {
            Ok(Self::Wep)
        } else if value.eq_ignore_ascii_case("WPA") {
            Ok(Self::Wpa)
        } else if value.eq_ignore_ascii_case("WPA2") {
            Ok(Self::Wpa2)
        } else {
            Err(WifiError::InvalidArgument)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cipher {
    #[default]
    NotSet,
    Aes,
    Tkip,
    AesTkip,
}

impl Cipher {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSet => "NOT_SET",
            Self::Aes => "AES",
            Self::Tkip => "TKIP",
            Self::AesTkip => "AES_TKIP",
        }
    }
}

impl FromStr for Cipher {
    type Err = WifiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("AES") {
            Ok(Self::Aes)
        } else if value.eq_ignore_ascii_case("TKIP") {
            Ok(Self::Tkip)
        } else if value.eq_ignore_ascii_case("AES_TKIP") || value.eq_ignore_ascii_case("AESTKIP") {
            Ok(Self::AesTkip)
        } else {
            Err(WifiError::InvalidArgument)
        }
    }
}

/// Fields of the credential object passed to `setCredential`, as the
/// interpreter hands them over. Absent properties are `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CredentialOptions<'a> {
    pub ssid: Option<&'a str>,
    pub password: Option<&'a str>,
    pub sec: Option<&'a str>,
    pub cipher: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub ssid: Ssid,
    pub password: Password,
    pub security: Security,
    pub cipher: Cipher,
}

impl Credential {
    pub fn new(
        ssid: &str,
        password: &str,
        security: Security,
        cipher: Cipher,
    ) -> Result<Self, WifiError> {
        if ssid.is_empty() {
            return Err(WifiError::InvalidArgument);
        }
        if !matches!(security, Security::Unsecured) && password.is_empty() {
            return Err(WifiError::InvalidArgument);
        }
        let ssid = Ssid::try_from(ssid).map_err(|_| WifiError::InvalidArgument)?;
        let password = Password::try_from(password).map_err(|_| WifiError::InvalidArgument)?;
        Ok(Self {
            ssid,
            password,
            security,
            cipher,
        })
    }

    /// Validates every field independently; nothing is stored on error.
    pub fn from_options(options: &CredentialOptions<'_>) -> Result<Self, WifiError> {
        let ssid = options.ssid.ok_or(WifiError::InvalidArgument)?;
        let password = options.password.unwrap_or("");
        let security = match options.sec {
            Some(value) => value.parse::<Security>()?,
            None if password.is_empty() => Security::Unsecured,
            None => Security::Wpa2,
        };
        let cipher = match options.cipher {
            Some(value) => value.parse::<Cipher>()?,
            None => Cipher::NotSet,
        };
        Self::new(ssid, password, security, cipher)
    }
}
