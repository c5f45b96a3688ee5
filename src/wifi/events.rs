use embassy_time::Instant;

use crate::types::AssociationStatus;

/// Stack observations sampled once per `idle` tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TickInput {
    pub(crate) now: Instant,
    pub(crate) has_credentials: bool,
    /// Only sampled while `Connecting`.
    pub(crate) association: Option<AssociationStatus>,
    pub(crate) link_up: bool,
    pub(crate) listening: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WifiInput {
    PowerOn,
    PowerOff,
    Connect { now: Instant },
    Disconnect,
    SetAutoConnect(bool),
    CredentialsCleared,
    Tick(TickInput),
}
