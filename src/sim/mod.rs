//! In-memory stack used by host tests and the replay tool.

mod radio;
mod tcp;

pub use radio::{SimHostname, SimRadio, SimRadioCalls};
pub use tcp::{PeerId, SimClient, SimNet, SimServer, SimStack};
