use embassy_time::Duration;

pub const MAX_SERVER_SOCKETS: usize = 3;
pub const MAX_CLIENT_SOCKETS: usize = 10;

// The TCP MSS is 536; half of it keeps per-socket buffering within the
// interpreter's variable store.
pub const TCP_MSS: usize = 536;
pub const CHUNK_SIZE: usize = TCP_MSS / 2;

pub const WIFI_SSID_MAX: usize = 20;
pub const WIFI_PASSWORD_MAX: usize = 64;
// 802.11 allows 32 bytes; scan results report whatever the air carries.
pub const WIFI_SCAN_SSID_MAX: usize = 32;
pub const SCAN_RESULTS_MAX: usize = 16;
pub const HOSTNAME_MAX: usize = 64;
// The vendor stack keeps at most five networks.
pub const STORED_CREDENTIALS_MAX: usize = 5;

pub const NET_EVENT_QUEUE_DEPTH: usize = 8;

pub const PING_TRIES_MAX: u8 = 16;

pub const WIFI_CONNECT_RETRY_DEFAULT: u8 = 3;
// 10s: one association round on a healthy AP including the 4-way handshake.
pub const WIFI_ASSOCIATE_TIMEOUT_DEFAULT_MS: u32 = 10_000;
pub const WIFI_ASSOCIATE_TIMEOUT_MIN_MS: u32 = 500;
pub const WIFI_ASSOCIATE_TIMEOUT_MAX_MS: u32 = 60_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WifiPolicy {
    /// Automatic attempts before the radio is powered down and the failure latched.
    pub connect_retry_max: u8,
    /// How long `Connecting` may report `Pending` before the attempt counts as failed.
    pub associate_timeout_ms: u32,
    /// Re-arm `auto_connect` when an established link drops.
    pub reconnect_on_drop: bool,
    pub auto_connect_on_boot: bool,
}

impl WifiPolicy {
    pub const fn defaults() -> Self {
        Self {
            connect_retry_max: WIFI_CONNECT_RETRY_DEFAULT,
            associate_timeout_ms: WIFI_ASSOCIATE_TIMEOUT_DEFAULT_MS,
            reconnect_on_drop: true,
            auto_connect_on_boot: false,
        }
    }

    pub const fn sanitized(self) -> Self {
        Self {
            connect_retry_max: clamp_u8(self.connect_retry_max, 1, 16),
            associate_timeout_ms: clamp_u32(
                self.associate_timeout_ms,
                WIFI_ASSOCIATE_TIMEOUT_MIN_MS,
                WIFI_ASSOCIATE_TIMEOUT_MAX_MS,
            ),
            reconnect_on_drop: self.reconnect_on_drop,
            auto_connect_on_boot: self.auto_connect_on_boot,
        }
    }

    pub const fn associate_timeout(&self) -> Duration {
        Duration::from_millis(self.associate_timeout_ms as u64)
    }
}

impl Default for WifiPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
