//! Server assembly: shared state, configuration, startup.

pub mod config;
pub mod init;
pub mod state;
