//! Response encoding into caller-owned argument buffers.
//!
//! Numeric results are little-endian at offset zero. Nothing is written past
//! the buffer and a short buffer is rejected before any byte changes.

use sndseq_common::{SeqError, SeqResult};

/// Semantic result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// A 32-bit `int` result.
    Word(u32),
    /// Accepted with no payload.
    Acknowledge,
}

/// Request bytes inspected for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The leading byte.
    FirstByte,
    /// The leading four bytes as a little-endian word.
    Word,
}

impl Probe {
    /// Reads the probed bytes, or `None` if the buffer is too short.
    pub fn read(self, buf: &[u8]) -> Option<u32> {
        match self {
            Probe::FirstByte => buf.first().map(|&b| b as u32),
            Probe::Word => {
                let bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
                Some(u32::from_le_bytes(bytes))
            }
        }
    }

    /// Renders a probed value the way diagnostics print it.
    pub fn render(self, value: u32) -> String {
        match self {
            Probe::FirstByte => format!("{:02X}", value),
            Probe::Word => format!("{:08X}", value),
        }
    }
}

/// Serializes `response` into `buf` and returns the number of bytes written.
pub fn encode(response: Response, buf: &mut [u8]) -> SeqResult<usize> {
    match response {
        Response::Word(word) => {
            let bytes = word.to_le_bytes();
            let dst = buf.get_mut(..bytes.len()).ok_or(SeqError::ShortBuffer)?;
            dst.copy_from_slice(&bytes);
            Ok(bytes.len())
        }
        Response::Acknowledge => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_is_little_endian_at_offset_zero() {
        let mut buf = [0xAAu8; 6];
        assert_eq!(encode(Response::Word(0x0001_0001), &mut buf), Ok(4));
        assert_eq!(buf, [1, 0, 1, 0, 0xAA, 0xAA]);
    }

    #[test]
    fn short_buffer_is_untouched() {
        let mut buf = [0xAAu8; 3];
        assert_eq!(encode(Response::Word(0x21), &mut buf), Err(SeqError::ShortBuffer));
        assert_eq!(buf, [0xAA; 3]);
    }

    #[test]
    fn acknowledge_writes_nothing() {
        let mut buf = [7u8; 4];
        assert_eq!(encode(Response::Acknowledge, &mut buf), Ok(0));
        assert_eq!(buf, [7; 4]);
        assert_eq!(encode(Response::Acknowledge, &mut []), Ok(0));
    }

    #[test]
    fn probes_stay_in_bounds() {
        assert_eq!(Probe::FirstByte.read(&[]), None);
        assert_eq!(Probe::FirstByte.read(&[0x5A, 1]), Some(0x5A));
        assert_eq!(Probe::Word.read(&[1, 2, 3]), None);
        assert_eq!(Probe::Word.read(&[0x20, 0xA1, 0x07, 0x00, 9]), Some(0x0007_A120));
    }

    #[test]
    fn renders_like_the_device_log() {
        assert_eq!(Probe::FirstByte.render(0x0A), "0A");
        assert_eq!(Probe::Word.render(0x0007_A120), "0007A120");
    }
}
