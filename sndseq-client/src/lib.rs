//! # SndSeq Client
//!
//! Blocking client for the bridge protocol: one client is one open handle on
//! the emulated `snd/seq` device.
//!
//! ```no_run
//! use sndseq_client::SeqClient;
//!
//! let mut client = SeqClient::connect("127.0.0.1:7353")?;
//! client.open()?;
//! let version = client.protocol_version()?;
//! println!("sequencer protocol {version}");
//! client.close()?;
//! # Ok::<(), sndseq_client::ClientError>(())
//! ```

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use sndseq_common::ioctl::{SEQ_IOCTL_CLIENT_ID, SEQ_IOCTL_PVERSION};
use sndseq_common::protocol::{REPLY_HEADER_LEN, Reply, Request};
use sndseq_common::{ClientId, IoctlCode, ProtocolVersion};
use thiserror::Error;

/// Errors returned by [`SeqClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("bridge i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The device answered with an errno.
    #[error("device returned errno {0}")]
    Errno(i32),

    /// The reply did not have the expected shape.
    #[error("unexpected reply: {0}")]
    Malformed(&'static str),
}

impl ClientError {
    /// The errno carried by the reply, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            ClientError::Errno(errno) => Some(*errno),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Connection to a device shell.
#[derive(Debug)]
pub struct SeqClient {
    stream: TcpStream,
    frame: Vec<u8>,
}

impl SeqClient {
    pub fn connect(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(SeqClient { stream, frame: Vec::with_capacity(256) })
    }

    pub fn open(&mut self) -> ClientResult<()> {
        self.call(&Request::Open).map(drop)
    }

    pub fn close(&mut self) -> ClientResult<()> {
        self.call(&Request::Close).map(drop)
    }

    /// Issues a read of `resid` bytes and returns the stream offset.
    pub fn read(&mut self, resid: u32) -> ClientResult<u64> {
        let reply = self.call(&Request::Read { resid })?;
        reply.as_offset().ok_or(ClientError::Malformed("read offset"))
    }

    /// Writes `data` and returns the new stream offset.
    pub fn write(&mut self, data: &[u8]) -> ClientResult<u64> {
        let reply = self.call(&Request::Write { data: data.to_vec() })?;
        reply.as_offset().ok_or(ClientError::Malformed("write offset"))
    }

    /// Issues an ioctl with `arg` as the argument buffer.
    ///
    /// Bytes copied out by the device overwrite the start of `arg`; the
    /// number of copied bytes is returned.
    pub fn ioctl(&mut self, cmd: IoctlCode, arg: &mut [u8]) -> ClientResult<usize> {
        let reply = self.call(&Request::Ioctl { cmd, data: arg.to_vec() })?;
        let dst = arg
            .get_mut(..reply.data.len())
            .ok_or(ClientError::Malformed("ioctl copy-out larger than argument"))?;
        dst.copy_from_slice(&reply.data);
        Ok(reply.data.len())
    }

    pub fn protocol_version(&mut self) -> ClientResult<ProtocolVersion> {
        Ok(ProtocolVersion::from_packed(self.ioctl_int(SEQ_IOCTL_PVERSION)?))
    }

    pub fn client_id(&mut self) -> ClientResult<ClientId> {
        Ok(ClientId(self.ioctl_int(SEQ_IOCTL_CLIENT_ID)?))
    }

    fn ioctl_int(&mut self, cmd: IoctlCode) -> ClientResult<u32> {
        let mut arg = [0u8; 4];
        if self.ioctl(cmd, &mut arg)? != arg.len() {
            return Err(ClientError::Malformed("short int reply"));
        }
        Ok(u32::from_le_bytes(arg))
    }

    fn call(&mut self, request: &Request) -> ClientResult<Reply> {
        self.frame.clear();
        request.encode(&mut self.frame);
        self.stream.write_all(&self.frame)?;

        let mut header = [0u8; REPLY_HEADER_LEN];
        self.stream.read_exact(&mut header)?;
        let (status, len) = Reply::parse_header(header);
        let mut data = vec![0u8; len];
        self.stream.read_exact(&mut data)?;

        let reply = Reply { status, data };
        if reply.is_ok() {
            Ok(reply)
        } else {
            Err(ClientError::Errno(reply.status))
        }
    }
}
