//! # Bridge Server
//!
//! Accept bridge connections and run each one as a device session.
//!
//! One connection is one file handle: `OPEN` creates the session, `CLOSE`
//! or disconnect ends it. Requests on a connection are answered in order.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use sndseq_common::{SeqError, SeqResult};
use sndseq_common::protocol::{Reply, Request};
use sndseq_engine::SeqDispatch;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::protocol::FrameParser;
use crate::session::{DeviceShell, Session, Uio};

const SERVER_TARGET: &str = "sndseq::server";

/// Binds the bridge listener with address reuse enabled.
pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    TcpListener::from_std(socket.into())
}

/// Accepts connections until `shutdown` resolves.
pub async fn serve<D, F>(
    listener: TcpListener,
    shell: Arc<DeviceShell<D>>,
    shutdown: F,
) -> io::Result<()>
where
    D: SeqDispatch + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(target: SERVER_TARGET, "shutdown requested");
                return Ok(());
            }
            accept = listener.accept() => {
                let (stream, peer) = accept?;
                debug!(target: SERVER_TARGET, %peer, "connection accepted");
                let shell = Arc::clone(&shell);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, shell).await {
                        debug!(target: SERVER_TARGET, %peer, error = %err, "connection ended");
                    }
                });
            }
        }
    }
}

/// Resolves when `signal` fires.
///
/// A signal that fails to register is logged and never resolves, so the
/// server keeps running instead of stopping right after startup.
pub async fn shutdown_on<S>(signal: S)
where
    S: Future<Output = io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(target: SERVER_TARGET, error = %err, "shutdown signal unavailable, serving until killed");
        std::future::pending::<()>().await;
    }
}

/// Serves one connection until the peer disconnects or breaks framing.
pub async fn handle_connection<D>(mut stream: TcpStream, shell: Arc<DeviceShell<D>>) -> io::Result<()>
where
    D: SeqDispatch + 'static,
{
    stream.set_nodelay(true)?;
    let mut buf = BytesMut::with_capacity(4096);
    let mut out = Vec::with_capacity(256);
    let mut parser = FrameParser::new();
    let mut session: Option<Session<D>> = None;

    let result = 'conn: loop {
        loop {
            let (reply, fatal) = match parser.parse(&mut buf) {
                Ok(Some(request)) => (execute(&shell, &mut session, request), false),
                Ok(None) => break,
                Err(err) => {
                    warn!(target: SERVER_TARGET, error = %err, "malformed frame");
                    (Reply::errno(err.errno()), true)
                }
            };
            out.clear();
            reply.encode(&mut out);
            if let Err(err) = stream.write_all(&out).await {
                break 'conn Err(err);
            }
            if fatal {
                break 'conn Ok(());
            }
        }

        match stream.read_buf(&mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(err) => break Err(err),
        }
    };

    if let Some(session) = session.take() {
        session.close();
    }
    result
}

/// Runs one request against the connection's session.
fn execute<D: SeqDispatch>(
    shell: &Arc<DeviceShell<D>>,
    session: &mut Option<Session<D>>,
    request: Request,
) -> Reply {
    match request {
        Request::Open => {
            if session.is_some() {
                return Reply::errno(SeqError::InvalidArgument.errno());
            }
            match shell.open() {
                Ok(opened) => {
                    *session = Some(opened);
                    Reply::ok(Vec::new())
                }
                Err(err) => Reply::errno(err.errno()),
            }
        }
        Request::Close => match session.take() {
            Some(open) => {
                open.close();
                Reply::ok(Vec::new())
            }
            None => Reply::errno(SeqError::NotOpen.errno()),
        },
        Request::Read { resid } => on_session(session, |open| {
            let mut uio = Uio { offset: open.offset(), resid: resid as usize };
            open.read(&mut uio).map(|()| Reply::offset(uio.offset))
        }),
        Request::Write { data } => on_session(session, |open| {
            let mut uio = Uio { offset: open.offset(), resid: data.len() };
            open.write(&mut uio, &data).map(|()| Reply::offset(uio.offset))
        }),
        Request::Ioctl { cmd, data } => {
            on_session(session, |open| open.ioctl(cmd, &data).map(Reply::ok))
        }
    }
}

fn on_session<D: SeqDispatch>(
    session: &mut Option<Session<D>>,
    op: impl FnOnce(&mut Session<D>) -> SeqResult<Reply>,
) -> Reply {
    match session.as_mut() {
        Some(open) => op(open).unwrap_or_else(|err| Reply::errno(err.errno())),
        None => Reply::errno(SeqError::NotOpen.errno()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_follows_signal() {
        let signal = async { io::Result::Ok(()) };
        let fired = tokio::time::timeout(Duration::from_secs(1), shutdown_on(signal)).await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_keeps_serving() {
        let signal = async { io::Result::<()>::Err(io::Error::other("no signal handler")) };
        let fired = tokio::time::timeout(Duration::from_millis(50), shutdown_on(signal)).await;
        assert!(fired.is_err());
    }
}
