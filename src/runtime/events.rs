use core::net::Ipv4Addr;

use crate::types::{ScanResults, StoredCredentials, WifiDetails};

/// Opaque handle for an interpreter callback, echoed back with its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackToken(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetReply {
    /// The operation finished with nothing to report.
    Done,
    Connected,
    /// Automatic retries gave up, or the attempt was cancelled by `off`/`disconnect`.
    ConnectFailed,
    Details(WifiDetails),
    Scan(ScanResults),
    Credentials(StoredCredentials),
    Resolved(Option<Ipv4Addr>),
    Ping(u32),
}

/// Deferred result of a control call, drained with `poll_event`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetEvent {
    pub token: CallbackToken,
    pub reply: NetReply,
}
