//! Scalar values answered by the sequencer queries.

use core::fmt;

/// Packed sequencer protocol version.
///
/// The wire form is an `int` of `(major << 16) | (minor << 8) | subminor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
    pub subminor: u8,
}

impl ProtocolVersion {
    /// Version reported to every caller.
    pub const CURRENT: ProtocolVersion = ProtocolVersion { major: 1, minor: 0, subminor: 1 };

    pub const fn packed(self) -> u32 {
        ((self.major as u32) << 16) | ((self.minor as u32) << 8) | self.subminor as u32
    }

    pub const fn from_packed(word: u32) -> Self {
        ProtocolVersion {
            major: (word >> 16) as u8,
            minor: (word >> 8) as u8,
            subminor: word as u8,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.subminor)
    }
}

/// Sequencer client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl ClientId {
    /// Identifier handed to every caller.
    pub const FIXED: ClientId = ClientId(0x21);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_wire_bytes() {
        assert_eq!(ProtocolVersion::CURRENT.packed().to_le_bytes(), [1, 0, 1, 0]);
        assert_eq!(ProtocolVersion::CURRENT.to_string(), "1.0.1");
    }

    #[test]
    fn version_unpacks() {
        assert_eq!(ProtocolVersion::from_packed(0x0001_0001), ProtocolVersion::CURRENT);
    }

    #[test]
    fn fixed_client_id_wire_bytes() {
        assert_eq!(ClientId::FIXED.0.to_le_bytes(), [0x21, 0, 0, 0]);
    }
}
