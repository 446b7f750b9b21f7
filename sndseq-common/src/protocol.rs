//! # Bridge Frames
//!
//! Purpose: Define the little-endian frames through which the user-space device
//! shell exposes the `snd/seq` surface (open, close, read, write, ioctl).
//!
//! ## Memory Layout
//!
//! ```text
//! Request:
//! +-------+----------------------------------------------+
//! | op:1B | body                                         |
//! +-------+----------------------------------------------+
//!   OPEN / CLOSE : (empty)
//!   READ         : resid:4B
//!   WRITE        : len:4B | data[len]
//!   IOCTL        : cmd:4B | len:4B | data[len]
//!
//! Reply:
//! +-----------+--------+-----------+
//! | status:4B | len:4B | data[len] |
//! +-----------+--------+-----------+
//! ```
//!
//! `status` is zero on success or a positive errno. READ and WRITE replies
//! carry the stream offset as an 8-byte little-endian integer; IOCTL replies
//! carry the copied-out argument buffer.

use crate::ioctl::IoctlCode;

pub const OP_OPEN: u8 = 1;
pub const OP_CLOSE: u8 = 2;
pub const OP_READ: u8 = 3;
pub const OP_WRITE: u8 = 4;
pub const OP_IOCTL: u8 = 5;

/// Largest body accepted in a single frame.
pub const MAX_FRAME_PAYLOAD: usize = 64 * 1024;

/// Status value indicating success.
pub const STATUS_OK: i32 = 0;

/// Size of the fixed reply header.
pub const REPLY_HEADER_LEN: usize = 8;

/// One request against the device surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open,
    Close,
    Read { resid: u32 },
    Write { data: Vec<u8> },
    Ioctl { cmd: IoctlCode, data: Vec<u8> },
}

impl Request {
    /// Frame op byte for this request.
    pub fn op(&self) -> u8 {
        match self {
            Request::Open => OP_OPEN,
            Request::Close => OP_CLOSE,
            Request::Read { .. } => OP_READ,
            Request::Write { .. } => OP_WRITE,
            Request::Ioctl { .. } => OP_IOCTL,
        }
    }

    /// Appends the encoded frame to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.op());
        match self {
            Request::Open | Request::Close => {}
            Request::Read { resid } => out.extend_from_slice(&resid.to_le_bytes()),
            Request::Write { data } => {
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend_from_slice(data);
            }
            Request::Ioctl { cmd, data } => {
                out.extend_from_slice(&cmd.raw().to_le_bytes());
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend_from_slice(data);
            }
        }
    }
}

/// Reply to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: i32,
    pub data: Vec<u8>,
}

impl Reply {
    pub fn ok(data: Vec<u8>) -> Self {
        Reply { status: STATUS_OK, data }
    }

    /// Reply carrying only a stream offset.
    pub fn offset(offset: u64) -> Self {
        Reply::ok(offset.to_le_bytes().to_vec())
    }

    pub fn errno(errno: i32) -> Self {
        Reply { status: errno, data: Vec::new() }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Appends the encoded frame to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.status.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);
    }

    /// Parses the fixed header into `(status, len)`.
    pub fn parse_header(header: [u8; REPLY_HEADER_LEN]) -> (i32, usize) {
        let status = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        (status, len)
    }

    /// Interprets the payload as a stream offset.
    pub fn as_offset(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.data.as_slice().try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioctl::SEQ_IOCTL_PVERSION;

    #[test]
    fn encodes_ioctl_request() {
        let mut out = Vec::new();
        Request::Ioctl { cmd: SEQ_IOCTL_PVERSION, data: vec![0; 4] }.encode(&mut out);
        assert_eq!(out[0], OP_IOCTL);
        assert_eq!(&out[1..5], &0x4004_5300u32.to_le_bytes());
        assert_eq!(&out[5..9], &4u32.to_le_bytes());
        assert_eq!(out.len(), 13);
    }

    #[test]
    fn encodes_bare_requests() {
        let mut out = Vec::new();
        Request::Open.encode(&mut out);
        Request::Close.encode(&mut out);
        assert_eq!(out, vec![OP_OPEN, OP_CLOSE]);
    }

    #[test]
    fn reply_header_parses() {
        let mut out = Vec::new();
        Reply::errno(22).encode(&mut out);
        let header: [u8; REPLY_HEADER_LEN] = out[..REPLY_HEADER_LEN].try_into().unwrap();
        assert_eq!(Reply::parse_header(header), (22, 0));
    }

    #[test]
    fn offset_reply() {
        let reply = Reply::offset(42);
        assert!(reply.is_ok());
        assert_eq!(reply.as_offset(), Some(42));
        assert_eq!(Reply::ok(vec![1]).as_offset(), None);
    }
}
