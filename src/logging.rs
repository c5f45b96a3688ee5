//! Routes the `log` facade to the board console.
//!
//! Every record is formatted as `area: message key=value`, e.g.
//! `net: tcp client socket=4 closed`. Host builds leave the logger unset so
//! tests can install their own.

use log::LevelFilter;

#[cfg(feature = "esp32-console")]
pub fn init(level: LevelFilter) {
    esp_println::logger::init_logger(level);
    log::info!("net: console logger ready level={}", level);
}

#[cfg(not(feature = "esp32-console"))]
pub fn init(level: LevelFilter) {
    log::set_max_level(level);
}
