pub mod config;
pub mod device;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod session;
