//! # Ioctl Dispatcher
//!
//! Purpose: Resolve a command word, apply its response rule to the caller's
//! buffer and report a status.
//!
//! ## Design Principles
//!
//! 1. **Stateless**: The dispatcher only borrows the frozen registry; every
//!    call is independent and calls may run in parallel.
//! 2. **No Partial Writes**: Unrecognized words and short buffers fail before
//!    any byte of the buffer changes.
//! 3. **Best-Effort Diagnostics**: Each call emits one `tracing` record;
//!    logging never influences the result.

use sndseq_common::{IoctlCode, SeqError, SeqResult};
use tracing::{debug, warn};

use crate::encoder;
use crate::engine::{Outcome, SeqDispatch};
use crate::registry::{Registry, ResponseRule};

/// Log target for per-request diagnostics.
pub const IOCTL_TARGET: &str = "sndseq::ioctl";

/// Default `SeqDispatch` implementation backed by a registry.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    registry: &'static Registry,
}

impl Dispatcher {
    /// Creates a dispatcher over the process-wide registry.
    pub fn new() -> Self {
        Dispatcher::with_registry(Registry::global())
    }

    pub fn with_registry(registry: &'static Registry) -> Self {
        Dispatcher { registry }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new()
    }
}

impl SeqDispatch for Dispatcher {
    fn handle(&self, code: IoctlCode, buf: &mut [u8]) -> SeqResult<Outcome> {
        let Some(descriptor) = self.registry.resolve(code) else {
            warn!(
                target: IOCTL_TARGET,
                cmd = %format_args!("{:#010x}", code.raw()),
                len = buf.len(),
                "unrecognized"
            );
            return Err(SeqError::InvalidArgument);
        };

        match descriptor.rule {
            ResponseRule::Acknowledge(probe) => {
                match probe.read(buf) {
                    Some(value) => debug!(
                        target: IOCTL_TARGET,
                        op = descriptor.name,
                        cmd = %format_args!("{:#010x}", code.raw()),
                        databyte = %probe.render(value),
                        "acknowledged"
                    ),
                    None => debug!(
                        target: IOCTL_TARGET,
                        op = descriptor.name,
                        cmd = %format_args!("{:#010x}", code.raw()),
                        "acknowledged"
                    ),
                }
                Ok(Outcome::Acknowledged)
            }
            rule => {
                let len = buf.len();
                let written = encoder::encode(rule.response(), buf).inspect_err(|err| {
                    warn!(
                        target: IOCTL_TARGET,
                        op = descriptor.name,
                        cmd = %format_args!("{:#010x}", code.raw()),
                        len,
                        error = %err,
                        "response rejected"
                    )
                })?;
                debug!(
                    target: IOCTL_TARGET,
                    op = descriptor.name,
                    cmd = %format_args!("{:#010x}", code.raw()),
                    written,
                    "answered"
                );
                Ok(Outcome::Wrote(written))
            }
        }
    }

    fn operation_name(&self, code: IoctlCode) -> Option<&'static str> {
        self.registry.resolve(code).map(|d| d.name)
    }
}
