mod counters;

pub use counters::{snapshot, NetTelemetrySnapshot};
pub(crate) use counters::{
    record_accept, record_accept_dropped, record_event_dropped, record_socket_closed,
    record_socket_open_error, record_socket_opened, record_wifi_connect_attempt,
    record_wifi_connect_failure, record_wifi_connect_success, record_wifi_link_closed,
    record_wifi_link_drop, record_wifi_retries_exhausted,
};
