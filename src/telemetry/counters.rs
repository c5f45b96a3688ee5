use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

static SOCKETS_OPENED: AtomicU32 = AtomicU32::new(0);
static SOCKET_OPEN_ERRORS: AtomicU32 = AtomicU32::new(0);
static SOCKETS_CLOSED: AtomicU32 = AtomicU32::new(0);
static ACCEPTS: AtomicU32 = AtomicU32::new(0);
static ACCEPT_DROPS: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_ATTEMPTS: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_SUCCESSES: AtomicU32 = AtomicU32::new(0);
static WIFI_CONNECT_FAILURES: AtomicU32 = AtomicU32::new(0);
static WIFI_RETRIES_EXHAUSTED: AtomicU32 = AtomicU32::new(0);
static WIFI_LINK_DROPS: AtomicU32 = AtomicU32::new(0);
static NET_EVENTS_DROPPED: AtomicU32 = AtomicU32::new(0);
static WIFI_LINK_CONNECTED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetTelemetrySnapshot {
    pub sockets_opened: u32,
    pub socket_open_errors: u32,
    pub sockets_closed: u32,
    pub accepts: u32,
    pub accept_drops: u32,
    pub wifi_connect_attempts: u32,
    pub wifi_connect_successes: u32,
    pub wifi_connect_failures: u32,
    pub wifi_retries_exhausted: u32,
    pub wifi_link_drops: u32,
    pub net_events_dropped: u32,
    pub wifi_link_connected: bool,
}

pub(crate) fn record_socket_opened() {
    SOCKETS_OPENED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_socket_open_error() {
    SOCKET_OPEN_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_socket_closed() {
    SOCKETS_CLOSED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_accept() {
    ACCEPTS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_accept_dropped() {
    ACCEPT_DROPS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_wifi_connect_attempt() {
    WIFI_CONNECT_ATTEMPTS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_wifi_connect_success() {
    WIFI_CONNECT_SUCCESSES.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(true, Ordering::Relaxed);
}

pub(crate) fn record_wifi_connect_failure() {
    WIFI_CONNECT_FAILURES.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
}

pub(crate) fn record_wifi_retries_exhausted() {
    WIFI_RETRIES_EXHAUSTED.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_wifi_link_drop() {
    WIFI_LINK_DROPS.fetch_add(1, Ordering::Relaxed);
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
}

pub(crate) fn record_wifi_link_closed() {
    WIFI_LINK_CONNECTED.store(false, Ordering::Relaxed);
}

pub(crate) fn record_event_dropped() {
    NET_EVENTS_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> NetTelemetrySnapshot {
    NetTelemetrySnapshot {
        sockets_opened: SOCKETS_OPENED.load(Ordering::Relaxed),
        socket_open_errors: SOCKET_OPEN_ERRORS.load(Ordering::Relaxed),
        sockets_closed: SOCKETS_CLOSED.load(Ordering::Relaxed),
        accepts: ACCEPTS.load(Ordering::Relaxed),
        accept_drops: ACCEPT_DROPS.load(Ordering::Relaxed),
        wifi_connect_attempts: WIFI_CONNECT_ATTEMPTS.load(Ordering::Relaxed),
        wifi_connect_successes: WIFI_CONNECT_SUCCESSES.load(Ordering::Relaxed),
        wifi_connect_failures: WIFI_CONNECT_FAILURES.load(Ordering::Relaxed),
        wifi_retries_exhausted: WIFI_RETRIES_EXHAUSTED.load(Ordering::Relaxed),
        wifi_link_drops: WIFI_LINK_DROPS.load(Ordering::Relaxed),
        net_events_dropped: NET_EVENTS_DROPPED.load(Ordering::Relaxed),
        wifi_link_connected: WIFI_LINK_CONNECTED.load(Ordering::Relaxed),
    }
}
