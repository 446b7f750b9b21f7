//! # Device Shell and Sessions
//!
//! Purpose: Serve the `snd/seq` character-device surface (open, close, read,
//! write, ioctl) on top of a [`SeqDispatch`] implementation.
//!
//! ## Design Principles
//!
//! 1. **Kernel-Shaped Ioctl**: The shell allocates the argument buffer from
//!    the size encoded in the command word, copies caller bytes in for
//!    write-direction words and copies the buffer out for read-direction words.
//! 2. **Pass-Through Stream**: Writes are consumed whole, reads transfer
//!    nothing. The byte stream carries no protocol.
//! 3. **Detached Dispatcher**: Sessions never share mutable state with the
//!    dispatcher; all shared state lives in the module and the metrics.

use std::sync::Arc;
use std::time::Instant;

use sndseq_common::{IoctlCode, SeqError, SeqResult};
use sndseq_engine::SeqDispatch;
use tracing::{debug, info, trace};

use crate::device::{DeviceHandle, SeqModule};
use crate::metrics::Metrics;

const DEVICE_TARGET: &str = "sndseq::device";

/// Residual/offset pair describing one byte-stream transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uio {
    pub offset: u64,
    pub resid: usize,
}

/// The device surface shared by every session.
#[derive(Debug)]
pub struct DeviceShell<D> {
    module: Arc<SeqModule>,
    dispatcher: D,
    metrics: Arc<Metrics>,
}

impl<D: SeqDispatch> DeviceShell<D> {
    pub fn new(module: Arc<SeqModule>, dispatcher: D, metrics: Arc<Metrics>) -> Self {
        DeviceShell { module, dispatcher, metrics }
    }

    /// Opens a session on the live node.
    ///
    /// Fails with `NoDevice` while the module is unloaded.
    pub fn open(self: &Arc<Self>) -> SeqResult<Session<D>> {
        let device = self.module.device().ok_or(SeqError::NoDevice)?;
        info!(target: DEVICE_TARGET, "Opened device \"sndseq\" successfully.");
        self.metrics.record_open();
        Ok(Session {
            shell: Arc::clone(self),
            device,
            offset: 0,
        })
    }

    pub fn module(&self) -> &Arc<SeqModule> {
        &self.module
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }
}

/// One open handle on the device.
#[derive(Debug)]
pub struct Session<D> {
    shell: Arc<DeviceShell<D>>,
    device: DeviceHandle,
    offset: u64,
}

impl<D: SeqDispatch> Session<D> {
    /// Current stream offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read path: logs the request and transfers nothing.
    pub fn read(&mut self, uio: &mut Uio) -> SeqResult<()> {
        self.ensure_attached()?;
        uio.offset = self.offset;
        debug!(
            target: DEVICE_TARGET,
            resid = uio.resid,
            offset = uio.offset,
            "sndseq uio read"
        );
        Ok(())
    }

    /// Write path: consumes the whole residual and advances the offset.
    pub fn write(&mut self, uio: &mut Uio, data: &[u8]) -> SeqResult<()> {
        self.ensure_attached()?;
        uio.offset = self.offset;
        debug!(
            target: DEVICE_TARGET,
            resid = uio.resid,
            offset = uio.offset,
            "sndseq uio write"
        );
        trace!(target: DEVICE_TARGET, ddump = %hex_dump(data), "sndseq write payload");

        uio.offset += uio.resid as u64;
        self.shell.metrics.record_write(uio.resid);
        uio.resid = 0;
        self.offset = uio.offset;
        Ok(())
    }

    /// Ioctl path.
    ///
    /// Returns the argument buffer to copy back to the caller: the whole
    /// buffer for read-direction words, nothing otherwise. A caller payload
    /// shorter than the encoded size cannot be copied in and fails with
    /// `ShortBuffer`.
    pub fn ioctl(&self, code: IoctlCode, payload: &[u8]) -> SeqResult<Vec<u8>> {
        self.ensure_attached()?;
        let started = Instant::now();
        let result = self.ioctl_inner(code, payload);
        self.shell.metrics.record_ioctl(started.elapsed(), result.is_ok());
        result
    }

    fn ioctl_inner(&self, code: IoctlCode, payload: &[u8]) -> SeqResult<Vec<u8>> {
        let direction = code.direction();
        let size = code.size();
        debug!(
            target: DEVICE_TARGET,
            cmd = %format_args!("{:#010x}", code.raw()),
            direction = %direction,
            size,
            "sndseq ioctl"
        );

        let mut arg = vec![0u8; size];
        if direction.copies_in() {
            let src = payload.get(..size).ok_or(SeqError::ShortBuffer)?;
            arg.copy_from_slice(src);
        }

        let outcome = self.shell.dispatcher.handle(code, &mut arg)?;
        trace!(target: DEVICE_TARGET, ?outcome, "sndseq ioctl done");
        if direction.copies_out() {
            Ok(arg)
        } else {
            Ok(Vec::new())
        }
    }

    /// Closes the session. Dropping it has the same effect.
    pub fn close(self) {
        drop(self);
    }

    fn ensure_attached(&self) -> SeqResult<()> {
        if self.shell.module.serves(&self.device) {
            Ok(())
        } else {
            Err(SeqError::NoDevice)
        }
    }
}

impl<D> Drop for Session<D> {
    fn drop(&mut self) {
        info!(target: DEVICE_TARGET, "Closing device \"sndseq\".");
        self.shell.metrics.record_close();
    }
}

fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{:02X}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceRegistry, DeviceSpec, ModuleEvent};
    use sndseq_common::ioctl::*;
    use sndseq_engine::Dispatcher;

    fn shell() -> Arc<DeviceShell<Dispatcher>> {
        let module = Arc::new(SeqModule::new(
            Arc::new(DeviceRegistry::new()),
            DeviceSpec::sequencer(),
        ));
        module.handle_event(ModuleEvent::Load).unwrap();
        Arc::new(DeviceShell::new(module, Dispatcher::new(), Arc::new(Metrics::new())))
    }

    #[test]
    fn open_requires_loaded_module() {
        let shell = shell();
        shell.module().handle_event(ModuleEvent::Unload).unwrap();
        assert_eq!(shell.open().unwrap_err(), SeqError::NoDevice);
    }

    #[test]
    fn write_consumes_entire_residual() {
        let shell = shell();
        let mut session = shell.open().unwrap();
        let mut uio = Uio { offset: 0, resid: 5 };
        session.write(&mut uio, b"\x90\x3c\x7f\x80\x3c").unwrap();
        assert_eq!(uio, Uio { offset: 5, resid: 0 });

        let mut uio = Uio { offset: 0, resid: 3 };
        session.write(&mut uio, b"abc").unwrap();
        assert_eq!(uio, Uio { offset: 8, resid: 0 });
        assert_eq!(session.offset(), 8);
        assert_eq!(shell.metrics().snapshot().bytes_written, 8);
    }

    #[test]
    fn read_transfers_nothing() {
        let shell = shell();
        let mut session = shell.open().unwrap();
        let mut uio = Uio { offset: 0, resid: 64 };
        session.read(&mut uio).unwrap();
        assert_eq!(uio, Uio { offset: 0, resid: 64 });
    }

    #[test]
    fn version_ioctl_copies_out() {
        let shell = shell();
        let session = shell.open().unwrap();
        let out = session.ioctl(SEQ_IOCTL_PVERSION, &[]).unwrap();
        assert_eq!(out, vec![0x01, 0x00, 0x01, 0x00]);
        let out = session.ioctl(SEQ_IOCTL_CLIENT_ID, &[]).unwrap();
        assert_eq!(out, vec![0x21, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn write_only_ioctl_copies_nothing_out() {
        let shell = shell();
        let session = shell.open().unwrap();
        let tempo = vec![0x20u8; SEQ_IOCTL_SET_TEMPO.size()];
        assert_eq!(session.ioctl(SEQ_IOCTL_SET_TEMPO, &tempo).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn read_write_ioctl_echoes_argument() {
        let shell = shell();
        let session = shell.open().unwrap();
        let info: Vec<u8> = (0..SEQ_IOCTL_CREATE_PORT.size()).map(|i| i as u8).collect();
        assert_eq!(session.ioctl(SEQ_IOCTL_CREATE_PORT, &info).unwrap(), info);
    }

    #[test]
    fn short_copy_in_is_rejected() {
        let shell = shell();
        let session = shell.open().unwrap();
        assert_eq!(
            session.ioctl(SEQ_IOCTL_OPEN_PORT, &[1, 2, 3]),
            Err(SeqError::ShortBuffer)
        );
    }

    #[test]
    fn unknown_ioctl_is_invalid_and_counted() {
        let shell = shell();
        let session = shell.open().unwrap();
        assert_eq!(
            session.ioctl(IoctlCode::from_raw(0x4004_5302), &[]),
            Err(SeqError::InvalidArgument)
        );
        let snap = shell.metrics().snapshot();
        assert_eq!(snap.ioctls_total, 1);
        assert_eq!(snap.ioctls_rejected, 1);
    }

    #[test]
    fn sessions_detach_on_unload() {
        let shell = shell();
        let session = shell.open().unwrap();
        shell.module().handle_event(ModuleEvent::Unload).unwrap();
        assert_eq!(session.ioctl(SEQ_IOCTL_PVERSION, &[]), Err(SeqError::NoDevice));
        shell.module().handle_event(ModuleEvent::Load).unwrap();
        assert_eq!(session.ioctl(SEQ_IOCTL_PVERSION, &[]), Err(SeqError::NoDevice));
    }

    #[test]
    fn close_updates_open_sessions() {
        let shell = shell();
        let session = shell.open().unwrap();
        assert_eq!(shell.metrics().snapshot().open_sessions, 1);
        session.close();
        assert_eq!(shell.metrics().snapshot().open_sessions, 0);
    }

    #[test]
    fn dropped_sessions_are_closed() {
        let shell = shell();
        {
            let _first = shell.open().unwrap();
            let _second = shell.open().unwrap();
            assert_eq!(shell.metrics().snapshot().open_sessions, 2);
        }
        assert_eq!(shell.metrics().snapshot().open_sessions, 0);
    }

    #[test]
    fn shell_exposes_its_dispatcher() {
        let shell = shell();
        assert_eq!(shell.dispatcher().operation_name(SEQ_IOCTL_PVERSION), Some("pversion"));
    }

    #[test]
    fn hex_dump_formats_bytes() {
        assert_eq!(hex_dump(&[0x90, 0x3C, 0x7F]), "90 3C 7F");
        assert_eq!(hex_dump(&[]), "");
    }
}
