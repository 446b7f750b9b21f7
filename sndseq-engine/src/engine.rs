//! # Dispatch Interface
//!
//! ## Design Principles
//!
//! 1. **Strategy Pattern**: The device shell talks to the protocol core through
//!    a trait so alternative dispatchers can be swapped without touching it.
//! 2. **Caller-Owned Buffers**: Requests and responses share one byte buffer
//!    allocated by the shell, exactly like a kernel ioctl argument.
//! 3. **Zero-Cost Dispatch**: When used with generics, calls monomorphize.

use sndseq_common::{IoctlCode, SeqResult};

/// What a successful ioctl did to the argument buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response rule wrote this many bytes at the start of the buffer.
    Wrote(usize),
    /// The command was accepted and the buffer left untouched.
    Acknowledged,
}

/// Strategy pattern: the ioctl surface the device shell forwards to.
pub trait SeqDispatch: Send + Sync {
    /// Handles one ioctl request against the caller's argument buffer.
    ///
    /// Failures never modify `buf`.
    fn handle(&self, code: IoctlCode, buf: &mut [u8]) -> SeqResult<Outcome>;

    /// Returns the diagnostic name of a command, or `None` if unrecognized.
    fn operation_name(&self, code: IoctlCode) -> Option<&'static str>;
}
