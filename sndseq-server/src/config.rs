//! Shell configuration.
//!
//! Defaults, then an optional JSON file named by `SNDSEQ_CONFIG`, then the
//! `SNDSEQ_ADDR` and `SNDSEQ_DEVICE` overrides.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::device::{DeviceSpec, GID_WHEEL, MakeDevFlags, SEQ_DEVICE_NAME, UID_ROOT};

pub const ENV_CONFIG: &str = "SNDSEQ_CONFIG";
pub const ENV_ADDR: &str = "SNDSEQ_ADDR";
pub const ENV_DEVICE: &str = "SNDSEQ_DEVICE";

/// Default bridge port on the loopback interface.
pub const DEFAULT_PORT: u16 = 7353;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid listen address '{value}'")]
    Addr { value: String },
}

/// Settings for the device shell binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Bridge listen address.
    pub addr: SocketAddr,
    /// Device node name.
    pub device: String,
    /// Node permission bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            device: SEQ_DEVICE_NAME.to_string(),
            mode: 0o666,
            uid: UID_ROOT,
            gid: GID_WHEEL,
        }
    }
}

impl ShellConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        ShellConfig::load(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_CONFIG) {
            Some(path) => ShellConfig::from_file(PathBuf::from(path))?,
            None => ShellConfig::default(),
        };

        if let Some(value) = lookup(ENV_ADDR) {
            config.addr = value.parse().map_err(|_| ConfigError::Addr { value })?;
        }
        if let Some(device) = lookup(ENV_DEVICE) {
            config.device = device;
        }
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Node registration parameters derived from this configuration.
    pub fn device_spec(&self) -> DeviceSpec {
        DeviceSpec {
            name: self.device.clone(),
            uid: self.uid,
            gid: self.gid,
            mode: self.mode,
            flags: MakeDevFlags::CHECKNAME | MakeDevFlags::WAITOK,
        }
    }
}
