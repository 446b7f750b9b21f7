//! # Command Code Model
//!
//! Purpose: Decode and compose the 32-bit ioctl command words exchanged with
//! sequencer callers.
//!
//! ## Design Principles
//!
//! 1. **Total Decoding**: Every `u32` decodes to some structural value; there is
//!    no error path.
//! 2. **Structural Constants**: Known words are composed from their fields, so a
//!    new operation is a new constant rather than a new magic literal.
//! 3. **Exact Identity**: Equality is on the raw word. Two words sharing an
//!    operation number but differing in direction/size are distinct commands.
//!
//! ## Word Layout (BSD convention)
//!
//! ```text
//!  31  29 28              16 15          8 7            0
//! +------+------------------+-------------+--------------+
//! | dir  |   payload size   |  group tag  |  op number   |
//! +------+------------------+-------------+--------------+
//! | 3b   |       13b        |     8b      |      8b      |
//! +------+------------------+-------------+--------------+
//! ```

use core::fmt;

/// `IOC_VOID`: no payload is exchanged.
pub const IOC_VOID: u32 = 0x2000_0000;
/// `IOC_OUT`: the kernel writes the payload back ("out" of the kernel).
pub const IOC_OUT: u32 = 0x4000_0000;
/// `IOC_IN`: the caller supplies the payload ("in" to the kernel).
pub const IOC_IN: u32 = 0x8000_0000;
/// `IOC_INOUT`: payload travels both ways.
pub const IOC_INOUT: u32 = IOC_IN | IOC_OUT;
/// Mask covering all three direction bits.
pub const IOC_DIRMASK: u32 = IOC_VOID | IOC_OUT | IOC_IN;
/// Mask applied to the payload size field.
pub const IOCPARM_MASK: u32 = 0x1FFF;

const SIZE_SHIFT: u32 = 16;
const GROUP_SHIFT: u32 = 8;

/// Group tag reserved for the sequencer subsystem (`'S'`).
pub const SEQ_IOCTL_GROUP: u8 = b'S';

/// Transfer direction encoded in a command word, seen from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// No payload.
    None,
    /// Caller reads a payload produced by the device.
    Read,
    /// Caller writes a payload consumed by the device.
    Write,
    /// Caller writes a payload that the device may update in place.
    ReadWrite,
    /// Direction bits do not form a valid combination.
    Invalid,
}

impl Direction {
    /// Returns the direction bits for this direction.
    ///
    /// `Invalid` has no canonical encoding and maps to zero.
    pub const fn bits(self) -> u32 {
        match self {
            Self::None => IOC_VOID,
            Self::Read => IOC_OUT,
            Self::Write => IOC_IN,
            Self::ReadWrite => IOC_INOUT,
            Self::Invalid => 0,
        }
    }

    /// Classifies the direction bits of a raw word.
    pub const fn from_bits(word: u32) -> Self {
        match word & IOC_DIRMASK {
            IOC_VOID => Self::None,
            IOC_OUT => Self::Read,
            IOC_IN => Self::Write,
            IOC_INOUT => Self::ReadWrite,
            _ => Self::Invalid,
        }
    }

    /// True if the caller supplies bytes that must be copied in.
    pub const fn copies_in(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// True if the device produces bytes that must be copied out.
    pub const fn copies_out(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read-write",
            Self::Invalid => "invalid",
        };
        write!(f, "{}", label)
    }
}

/// Structural fields of a command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedCode {
    pub direction: Direction,
    /// Payload size in bytes, as encoded in the word.
    pub size: u16,
    /// Subsystem group tag.
    pub tag: u8,
    /// Operation number within the group.
    pub number: u8,
}

/// Opaque ioctl command word.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IoctlCode(u32);

impl IoctlCode {
    /// Wraps a raw word received from a caller.
    pub const fn from_raw(word: u32) -> Self {
        IoctlCode(word)
    }

    /// Returns the raw word.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Builds a canonical word from its fields.
    ///
    /// Sizes larger than `IOCPARM_MASK` are truncated, as the host macros do.
    pub const fn compose(direction: Direction, tag: u8, number: u8, size: u16) -> Self {
        IoctlCode(
            direction.bits()
                | ((size as u32 & IOCPARM_MASK) << SIZE_SHIFT)
                | ((tag as u32) << GROUP_SHIFT)
                | number as u32,
        )
    }

    /// Splits the word into its structural fields. Never fails.
    pub const fn decode(self) -> DecodedCode {
        DecodedCode {
            direction: Direction::from_bits(self.0),
            size: ((self.0 >> SIZE_SHIFT) & IOCPARM_MASK) as u16,
            tag: ((self.0 >> GROUP_SHIFT) & 0xFF) as u8,
            number: (self.0 & 0xFF) as u8,
        }
    }

    pub const fn direction(self) -> Direction {
        Direction::from_bits(self.0)
    }

    /// Payload size encoded in the word (`IOCPARM_LEN`).
    pub const fn size(self) -> usize {
        ((self.0 >> SIZE_SHIFT) & IOCPARM_MASK) as usize
    }

    pub const fn tag(self) -> u8 {
        ((self.0 >> GROUP_SHIFT) & 0xFF) as u8
    }

    pub const fn number(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// True if the word belongs to the sequencer group.
    pub const fn is_sequencer(self) -> bool {
        self.tag() == SEQ_IOCTL_GROUP
    }
}

impl fmt::Debug for IoctlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.decode();
        write!(
            f,
            "IoctlCode({:#010x}: {} size={} tag={:#04x} nr={:#04x})",
            self.0, d.direction, d.size, d.tag, d.number
        )
    }
}

impl fmt::LowerHex for IoctlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u32> for IoctlCode {
    fn from(word: u32) -> Self {
        IoctlCode(word)
    }
}

impl From<IoctlCode> for u32 {
    fn from(code: IoctlCode) -> Self {
        code.0
    }
}

/// `_IO`: command without payload.
pub const fn io(tag: u8, number: u8) -> IoctlCode {
    IoctlCode::compose(Direction::None, tag, number, 0)
}

/// `_IOR`: caller reads `size` bytes.
pub const fn ior(tag: u8, number: u8, size: u16) -> IoctlCode {
    IoctlCode::compose(Direction::Read, tag, number, size)
}

/// `_IOW`: caller writes `size` bytes.
pub const fn iow(tag: u8, number: u8, size: u16) -> IoctlCode {
    IoctlCode::compose(Direction::Write, tag, number, size)
}

/// `_IOWR`: payload of `size` bytes travels both ways.
pub const fn iowr(tag: u8, number: u8, size: u16) -> IoctlCode {
    IoctlCode::compose(Direction::ReadWrite, tag, number, size)
}

// Payload sizes of the sequencer records, as laid out by the emulated ABI.
const CLIENT_INFO_SIZE: u16 = 188;
const PORT_INFO_SIZE: u16 = 168;
const PORT_SUBSCRIBE_SIZE: u16 = 80;
const QUEUE_INFO_SIZE: u16 = 140;
const QUEUE_TEMPO_SIZE: u16 = 44;
const CLIENT_POOL_SIZE: u16 = 88;

/// Query the protocol version (`int`).
pub const SEQ_IOCTL_PVERSION: IoctlCode = ior(SEQ_IOCTL_GROUP, 0x00, 4);
/// Query the caller's client identifier (`int`).
pub const SEQ_IOCTL_CLIENT_ID: IoctlCode = ior(SEQ_IOCTL_GROUP, 0x01, 4);
/// Client name record, read-write shape.
pub const SEQ_IOCTL_CLIENT_NAME_RW: IoctlCode = iowr(SEQ_IOCTL_GROUP, 0x10, CLIENT_INFO_SIZE);
/// Client name record, write-only shape.
pub const SEQ_IOCTL_CLIENT_NAME_W: IoctlCode = iow(SEQ_IOCTL_GROUP, 0x11, CLIENT_INFO_SIZE);
pub const SEQ_IOCTL_CREATE_PORT: IoctlCode = iowr(SEQ_IOCTL_GROUP, 0x20, PORT_INFO_SIZE);
pub const SEQ_IOCTL_OPEN_PORT: IoctlCode = iow(SEQ_IOCTL_GROUP, 0x30, PORT_SUBSCRIBE_SIZE);
pub const SEQ_IOCTL_CREATE_QUEUE: IoctlCode = iowr(SEQ_IOCTL_GROUP, 0x32, QUEUE_INFO_SIZE);
pub const SEQ_IOCTL_SET_TEMPO: IoctlCode = iow(SEQ_IOCTL_GROUP, 0x42, QUEUE_TEMPO_SIZE);
/// Output sync record, read-write shape.
pub const SEQ_IOCTL_SYNC_OUTPUT_RW: IoctlCode = iowr(SEQ_IOCTL_GROUP, 0x4B, CLIENT_POOL_SIZE);
/// Output sync record, write-only shape.
pub const SEQ_IOCTL_SYNC_OUTPUT_W: IoctlCode = iow(SEQ_IOCTL_GROUP, 0x4C, CLIENT_POOL_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_constants_match_wire_words() {
        assert_eq!(SEQ_IOCTL_PVERSION.raw(), 0x4004_5300);
        assert_eq!(SEQ_IOCTL_CLIENT_ID.raw(), 0x4004_5301);
        assert_eq!(SEQ_IOCTL_CLIENT_NAME_RW.raw(), 0xC0BC_5310);
        assert_eq!(SEQ_IOCTL_CLIENT_NAME_W.raw(), 0x80BC_5311);
        assert_eq!(SEQ_IOCTL_CREATE_PORT.raw(), 0xC0A8_5320);
        assert_eq!(SEQ_IOCTL_OPEN_PORT.raw(), 0x8050_5330);
        assert_eq!(SEQ_IOCTL_CREATE_QUEUE.raw(), 0xC08C_5332);
        assert_eq!(SEQ_IOCTL_SET_TEMPO.raw(), 0x802C_5342);
        assert_eq!(SEQ_IOCTL_SYNC_OUTPUT_RW.raw(), 0xC058_534B);
        assert_eq!(SEQ_IOCTL_SYNC_OUTPUT_W.raw(), 0x8058_534C);
    }

    #[test]
    fn decodes_version_query() {
        let d = SEQ_IOCTL_PVERSION.decode();
        assert_eq!(d.direction, Direction::Read);
        assert_eq!(d.size, 4);
        assert_eq!(d.tag, b'S');
        assert_eq!(d.number, 0);
    }

    #[test]
    fn decodes_extreme_patterns() {
        let zero = IoctlCode::from_raw(0).decode();
        assert_eq!(zero.direction, Direction::Invalid);
        assert_eq!((zero.size, zero.tag, zero.number), (0, 0, 0));

        let ones = IoctlCode::from_raw(u32::MAX).decode();
        assert_eq!(ones.direction, Direction::Invalid);
        assert_eq!(ones.size, IOCPARM_MASK as u16);
        assert_eq!((ones.tag, ones.number), (0xFF, 0xFF));
    }

    #[test]
    fn decode_then_compose_is_identity_for_valid_directions() {
        for word in [0x2000_5301u32, 0x4004_5300, 0x80BC_5311, 0xC058_534B] {
            let code = IoctlCode::from_raw(word);
            let d = code.decode();
            assert_eq!(IoctlCode::compose(d.direction, d.tag, d.number, d.size), code);
        }
    }

    #[test]
    fn copy_directions() {
        assert!(Direction::Write.copies_in());
        assert!(!Direction::Write.copies_out());
        assert!(Direction::ReadWrite.copies_in() && Direction::ReadWrite.copies_out());
        assert!(!Direction::None.copies_in() && !Direction::None.copies_out());
        assert!(!Direction::Invalid.copies_in() && !Direction::Invalid.copies_out());
    }

    #[test]
    fn io_has_void_direction() {
        assert_eq!(io(SEQ_IOCTL_GROUP, 1).raw(), 0x2000_5301);
        assert!(io(SEQ_IOCTL_GROUP, 1).is_sequencer());
    }
}
