//! # SndSeq Error Types
//!
//! ## Design Principles
//!
//! 1. **Stable Codes**: Each variant has a fixed numeric code for the bridge.
//! 2. **Errno Mapping**: Every variant maps to the host errno relayed to callers.
//! 3. **Low Overhead**: Enums are `Copy` and `repr(u16)`.
//! 4. **No Retries**: Nothing in the emulation is transient.

use core::fmt;

/// Result type used across SndSeq components.
pub type SeqResult<T> = core::result::Result<T, SeqError>;

/// Host errno values relayed to callers.
pub mod errno {
    pub const ENXIO: i32 = 6;
    pub const EBADF: i32 = 9;
    pub const EFAULT: i32 = 14;
    pub const EEXIST: i32 = 17;
    pub const EINVAL: i32 = 22;
    pub const EOPNOTSUPP: i32 = 45;
}

/// High-level category for grouping error codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SeqErrorCategory {
    /// The caller sent something the device does not accept.
    Client,
    /// The device node is missing or cannot be created.
    Device,
    /// Bridge framing errors.
    Protocol,
}

/// Error codes shared by the dispatcher, the device shell and the bridge.
#[repr(u16)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SeqError {
    /// Client error: command word not recognized (code 1).
    InvalidArgument = 1,
    /// Client error: buffer smaller than the response (code 2).
    ShortBuffer = 2,
    /// Client error: request on a handle that is not open (code 3).
    NotOpen = 3,

    /// Device error: node not registered (code 10).
    NoDevice = 10,
    /// Device error: node name already taken (code 11).
    AlreadyExists = 11,
    /// Device error: lifecycle event not supported (code 12).
    Unsupported = 12,

    /// Protocol error: malformed bridge frame (code 30).
    ProtocolViolation = 30,
}

impl SeqError {
    /// Returns the stable numeric code for the error.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Returns the errno reported to the caller.
    pub const fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument | Self::ProtocolViolation => errno::EINVAL,
            Self::ShortBuffer => errno::EFAULT,
            Self::NotOpen => errno::EBADF,
            Self::NoDevice => errno::ENXIO,
            Self::AlreadyExists => errno::EEXIST,
            Self::Unsupported => errno::EOPNOTSUPP,
        }
    }

    pub const fn category(self) -> SeqErrorCategory {
        match self {
            Self::InvalidArgument | Self::ShortBuffer | Self::NotOpen => SeqErrorCategory::Client,
            Self::NoDevice | Self::AlreadyExists | Self::Unsupported => SeqErrorCategory::Device,
            Self::ProtocolViolation => SeqErrorCategory::Protocol,
        }
    }

    /// Converts a numeric code into a typed error.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::ShortBuffer),
            3 => Some(Self::NotOpen),
            10 => Some(Self::NoDevice),
            11 => Some(Self::AlreadyExists),
            12 => Some(Self::Unsupported),
            30 => Some(Self::ProtocolViolation),
            _ => None,
        }
    }
}

impl fmt::Display for SeqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidArgument => "invalid argument",
            Self::ShortBuffer => "bad address",
            Self::NotOpen => "bad file descriptor",
            Self::NoDevice => "device not configured",
            Self::AlreadyExists => "file exists",
            Self::Unsupported => "operation not supported",
            Self::ProtocolViolation => "protocol violation",
        };
        write!(f, "{}", label)
    }
}

impl std::error::Error for SeqError {}

#[cfg(test)]
mod tests {
    use super::{SeqError, SeqErrorCategory, errno};

    #[test]
    fn maps_error_categories() {
        assert_eq!(SeqError::InvalidArgument.category(), SeqErrorCategory::Client);
        assert_eq!(SeqError::NoDevice.category(), SeqErrorCategory::Device);
        assert_eq!(SeqError::ProtocolViolation.category(), SeqErrorCategory::Protocol);
    }

    #[test]
    fn maps_errno() {
        assert_eq!(SeqError::InvalidArgument.errno(), errno::EINVAL);
        assert_eq!(SeqError::Unsupported.errno(), errno::EOPNOTSUPP);
        assert_eq!(SeqError::ShortBuffer.errno(), errno::EFAULT);
    }

    #[test]
    fn converts_from_code() {
        assert_eq!(SeqError::from_code(1), Some(SeqError::InvalidArgument));
        assert_eq!(SeqError::from_code(SeqError::Unsupported.code()), Some(SeqError::Unsupported));
        assert_eq!(SeqError::from_code(99), None);
    }
}
