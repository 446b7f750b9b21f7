//! # Bridge Frame Parser
//!
//! Parse device requests from a streaming TCP buffer.
//!
//! ## Design Principles
//!
//! 1. **State Machine Pattern**: Explicit parser states avoid backtracking and
//!    keep control flow predictable.
//! 2. **Streaming Friendly**: The parser consumes from a mutable buffer and
//!    returns `None` when more data is needed.
//! 3. **Fail Fast**: Unknown ops and oversized bodies are rejected before the
//!    body is buffered.

use bytes::{Buf, BytesMut};
use sndseq_common::IoctlCode;
use sndseq_common::SeqError;
use sndseq_common::protocol::{
    MAX_FRAME_PAYLOAD, OP_CLOSE, OP_IOCTL, OP_OPEN, OP_READ, OP_WRITE, Request,
};

/// Streaming parser for bridge requests.
#[derive(Debug)]
pub struct FrameParser {
    state: ParseState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Op,
    Header { op: u8 },
    Body { op: u8, cmd: u32, len: usize },
}

impl FrameParser {
    pub fn new() -> Self {
        FrameParser { state: ParseState::Op }
    }

    /// Attempts to parse a single request from the buffer.
    ///
    /// Returns `Ok(None)` if more data is required.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<Option<Request>, SeqError> {
        loop {
            match self.state {
                ParseState::Op => {
                    if buf.is_empty() {
                        return Ok(None);
                    }
                    match buf.get_u8() {
                        OP_OPEN => return Ok(Some(Request::Open)),
                        OP_CLOSE => return Ok(Some(Request::Close)),
                        op @ (OP_READ | OP_WRITE | OP_IOCTL) => {
                            self.state = ParseState::Header { op };
                        }
                        _ => return Err(SeqError::ProtocolViolation),
                    }
                }
                ParseState::Header { op } => {
                    let need = if op == OP_IOCTL { 8 } else { 4 };
                    if buf.len() < need {
                        return Ok(None);
                    }
                    match op {
                        OP_READ => {
                            let resid = buf.get_u32_le();
                            self.state = ParseState::Op;
                            return Ok(Some(Request::Read { resid }));
                        }
                        OP_WRITE => {
                            let len = body_len(buf.get_u32_le())?;
                            self.state = ParseState::Body { op, cmd: 0, len };
                        }
                        _ => {
                            let cmd = buf.get_u32_le();
                            let len = body_len(buf.get_u32_le())?;
                            self.state = ParseState::Body { op, cmd, len };
                        }
                    }
                }
                ParseState::Body { op, cmd, len } => {
                    if buf.len() < len {
                        return Ok(None);
                    }
                    let data = buf.split_to(len).to_vec();
                    self.state = ParseState::Op;
                    let request = if op == OP_WRITE {
                        Request::Write { data }
                    } else {
                        Request::Ioctl { cmd: IoctlCode::from_raw(cmd), data }
                    };
                    return Ok(Some(request));
                }
            }
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        FrameParser::new()
    }
}

fn body_len(raw: u32) -> Result<usize, SeqError> {
    let len = raw as usize;
    if len > MAX_FRAME_PAYLOAD {
        return Err(SeqError::ProtocolViolation);
    }
    Ok(len)
}
