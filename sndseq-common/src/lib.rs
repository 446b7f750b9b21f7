// sndseq-common - Shared types and protocol definitions for SndSeq
//
// This crate defines the sequencer ioctl namespace and the bridge frames used
// between the device shell and its callers

pub mod ioctl;
pub mod error;
pub mod protocol;
pub mod types;

// Re-export for convenience
pub use ioctl::*;
pub use error::*;
pub use types::*;
