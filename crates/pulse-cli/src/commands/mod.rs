//! Command implementations for pulse-cli

pub mod sample;
pub mod watch;

pub use sample::sample;
pub use watch::watch;
