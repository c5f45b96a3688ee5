//! WiFi link lifecycle: a pure connection machine plus the manager that
//! performs its radio actions.

mod actions;
mod engine;
mod events;
mod machine;
mod manager;
#[cfg(test)]
mod tests;

pub use actions::{DropReason, WifiApplyStatus};
pub use machine::WifiFlags;
pub use manager::{WifiManager, WifiStep};
