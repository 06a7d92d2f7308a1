pub mod config;
pub mod display;
pub mod logging;
pub mod overlay;

#[cfg(windows)]
pub mod autostart;
#[cfg(windows)]
pub mod platform;
#[cfg(windows)]
pub mod tray;
