//! # Device Nodes and Module Lifecycle
//!
//! Purpose: Emulate the host's character-device registration (`make_dev_p` /
//! `destroy_dev`) and the module loader that owns the `snd/seq` node.
//!
//! ## Design Principles
//!
//! 1. **Single Owner**: The module is the only holder of the live device
//!    handle; the dispatcher never sees it.
//! 2. **All or Nothing**: A failed load leaves nothing registered.
//! 3. **Coarse Locking**: Registration is a rare control-plane operation, so
//!    one mutex per table is enough.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use parking_lot::Mutex;
use sndseq_common::SeqError;
use thiserror::Error;
use tracing::info;

/// Longest accepted node name (`SPECNAMELEN`).
pub const SPECNAMELEN: usize = 255;

/// Node name of the sequencer device.
pub const SEQ_DEVICE_NAME: &str = "snd/seq";

/// Owner and group of the sequencer node (`UID_ROOT`, `GID_WHEEL`).
pub const UID_ROOT: u32 = 0;
pub const GID_WHEEL: u32 = 0;

bitflags! {
    /// Flags accepted by [`DeviceRegistry::make_dev`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MakeDevFlags: u32 {
        /// Caller may sleep while the node is created.
        const WAITOK = 0x08;
        /// Validate the name and report collisions instead of panicking.
        const CHECKNAME = 0x20;
    }
}

/// Lifecycle events delivered by the module loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent {
    Load,
    Unload,
    Quiesce,
    Shutdown,
}

/// Errors raised while registering nodes or handling module events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The name failed `CHECKNAME` validation.
    #[error("invalid device name '{name}'")]
    InvalidName { name: String },

    /// A node with this name is already registered.
    #[error("device '{name}' already exists")]
    AlreadyExists { name: String },

    /// The node is not registered.
    #[error("device not configured")]
    NoDevice,

    /// The module does not handle this lifecycle event.
    #[error("module event {event:?} not supported")]
    Unsupported { event: ModuleEvent },
}

impl DeviceError {
    /// Shared error code for this failure.
    pub fn kind(&self) -> SeqError {
        match self {
            DeviceError::InvalidName { .. } => SeqError::InvalidArgument,
            DeviceError::AlreadyExists { .. } => SeqError::AlreadyExists,
            DeviceError::NoDevice => SeqError::NoDevice,
            DeviceError::Unsupported { .. } => SeqError::Unsupported,
        }
    }

    pub fn errno(&self) -> i32 {
        self.kind().errno()
    }
}

/// Parameters for a node to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    /// Permission bits of the node.
    pub mode: u32,
    pub flags: MakeDevFlags,
}

impl DeviceSpec {
    /// The sequencer node as the module registers it.
    pub fn sequencer() -> Self {
        DeviceSpec {
            name: SEQ_DEVICE_NAME.to_string(),
            uid: UID_ROOT,
            gid: GID_WHEEL,
            mode: 0o666,
            flags: MakeDevFlags::CHECKNAME | MakeDevFlags::WAITOK,
        }
    }
}

/// Reference to a registered node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceHandle {
    name: String,
    id: u64,
}

impl DeviceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
struct DeviceNode {
    spec: DeviceSpec,
    id: u64,
}

/// Table of registered character-device nodes.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    nodes: Mutex<HashMap<String, DeviceNode>>,
    next_id: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry::default()
    }

    /// Registers a node.
    ///
    /// With `CHECKNAME` the name is validated first. A collision is always an
    /// error; nothing is registered on failure.
    pub fn make_dev(&self, spec: DeviceSpec) -> Result<DeviceHandle, DeviceError> {
        if spec.flags.contains(MakeDevFlags::CHECKNAME) && !is_valid_name(&spec.name) {
            return Err(DeviceError::InvalidName { name: spec.name });
        }

        let mut nodes = self.nodes.lock();
        if nodes.contains_key(&spec.name) {
            return Err(DeviceError::AlreadyExists { name: spec.name });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = DeviceHandle { name: spec.name.clone(), id };
        info!(
            target: "sndseq::device",
            name = %spec.name,
            uid = spec.uid,
            gid = spec.gid,
            mode = %format_args!("{:04o}", spec.mode),
            "device node created"
        );
        nodes.insert(spec.name.clone(), DeviceNode { spec, id });
        Ok(handle)
    }

    /// Removes a node. Returns false if the handle is stale.
    pub fn destroy_dev(&self, handle: &DeviceHandle) -> bool {
        let mut nodes = self.nodes.lock();
        match nodes.get(&handle.name) {
            Some(node) if node.id == handle.id => {
                nodes.remove(&handle.name);
                info!(target: "sndseq::device", name = %handle.name, "device node destroyed");
                true
            }
            _ => false,
        }
    }

    /// True if the handle still refers to a registered node.
    pub fn is_live(&self, handle: &DeviceHandle) -> bool {
        self.nodes
            .lock()
            .get(&handle.name)
            .is_some_and(|node| node.id == handle.id)
    }

    /// Returns the registration parameters of a node by name.
    pub fn lookup(&self, name: &str) -> Option<DeviceSpec> {
        self.nodes.lock().get(name).map(|node| node.spec.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}

fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > SPECNAMELEN || name.starts_with('/') {
        return false;
    }
    if name.bytes().any(|b| !(0x21..0x7F).contains(&b)) {
        return false;
    }
    name.split('/')
        .all(|part| !part.is_empty() && part != "." && part != "..")
}

/// The sequencer module: owns the live device handle between load and unload.
#[derive(Debug)]
pub struct SeqModule {
    registry: Arc<DeviceRegistry>,
    spec: DeviceSpec,
    device: Mutex<Option<DeviceHandle>>,
}

impl SeqModule {
    pub fn new(registry: Arc<DeviceRegistry>, spec: DeviceSpec) -> Self {
        SeqModule {
            registry,
            spec,
            device: Mutex::new(None),
        }
    }

    /// Handles a loader event.
    ///
    /// `Load` creates the node, `Unload` destroys it (a no-op when not loaded)
    /// and everything else is `Unsupported`.
    pub fn handle_event(&self, event: ModuleEvent) -> Result<(), DeviceError> {
        match event {
            ModuleEvent::Load => {
                let mut device = self.device.lock();
                if device.is_some() {
                    return Err(DeviceError::AlreadyExists { name: self.spec.name.clone() });
                }
                *device = Some(self.registry.make_dev(self.spec.clone())?);
                info!(target: "sndseq::module", "ALSA snd/seq emulator loaded");
                Ok(())
            }
            ModuleEvent::Unload => {
                if let Some(handle) = self.device.lock().take() {
                    self.registry.destroy_dev(&handle);
                }
                info!(target: "sndseq::module", "ALSA snd/seq emulator unloaded");
                Ok(())
            }
            other => Err(DeviceError::Unsupported { event: other }),
        }
    }

    /// Live device handle, if the module is loaded.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.device.lock().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.device.lock().is_some()
    }

    /// True if `handle` is the node this module currently serves.
    pub fn serves(&self, handle: &DeviceHandle) -> bool {
        self.device.lock().as_ref() == Some(handle) && self.registry.is_live(handle)
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> SeqModule {
        SeqModule::new(Arc::new(DeviceRegistry::new()), DeviceSpec::sequencer())
    }

    #[test]
    fn load_creates_node_with_sequencer_permissions() {
        let module = module();
        module.handle_event(ModuleEvent::Load).unwrap();
        assert!(module.is_loaded());
        let spec = module.registry().lookup(SEQ_DEVICE_NAME).unwrap();
        assert_eq!(spec.mode, 0o666);
        assert_eq!((spec.uid, spec.gid), (UID_ROOT, GID_WHEEL));
    }

    #[test]
    fn unload_destroys_node() {
        let module = module();
        module.handle_event(ModuleEvent::Load).unwrap();
        let handle = module.device().unwrap();
        module.handle_event(ModuleEvent::Unload).unwrap();
        assert!(!module.is_loaded());
        assert!(!module.serves(&handle));
        assert!(module.registry().is_empty());
    }

    #[test]
    fn unload_without_load_is_noop() {
        assert_eq!(module().handle_event(ModuleEvent::Unload), Ok(()));
    }

    #[test]
    fn other_events_are_unsupported() {
        let module = module();
        let err = module.handle_event(ModuleEvent::Quiesce).unwrap_err();
        assert_eq!(err.errno(), sndseq_common::errno::EOPNOTSUPP);
        assert!(module.handle_event(ModuleEvent::Shutdown).is_err());
        assert!(!module.is_loaded());
    }

    #[test]
    fn double_load_is_rejected() {
        let module = module();
        module.handle_event(ModuleEvent::Load).unwrap();
        let err = module.handle_event(ModuleEvent::Load).unwrap_err();
        assert_eq!(err.kind(), SeqError::AlreadyExists);
        assert_eq!(module.registry().len(), 1);
    }

    #[test]
    fn load_fails_cleanly_when_name_taken() {
        let registry = Arc::new(DeviceRegistry::new());
        registry.make_dev(DeviceSpec::sequencer()).unwrap();
        let module = SeqModule::new(Arc::clone(&registry), DeviceSpec::sequencer());
        let err = module.handle_event(ModuleEvent::Load).unwrap_err();
        assert_eq!(err, DeviceError::AlreadyExists { name: SEQ_DEVICE_NAME.to_string() });
        assert!(!module.is_loaded());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn checkname_rejects_bad_names() {
        let registry = DeviceRegistry::new();
        for name in ["", "/snd/seq", "snd//seq", "snd/../seq", "snd/seq/", "snd/s q", "./seq"] {
            let spec = DeviceSpec { name: name.to_string(), ..DeviceSpec::sequencer() };
            let err = registry.make_dev(spec).unwrap_err();
            assert_eq!(err.kind(), SeqError::InvalidArgument, "{name:?}");
        }
        let long = DeviceSpec { name: "a".repeat(SPECNAMELEN + 1), ..DeviceSpec::sequencer() };
        assert!(registry.make_dev(long).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn names_are_unchecked_without_flag() {
        let registry = DeviceRegistry::new();
        let spec = DeviceSpec {
            name: "odd name".to_string(),
            flags: MakeDevFlags::WAITOK,
            ..DeviceSpec::sequencer()
        };
        assert!(registry.make_dev(spec).is_ok());
    }

    #[test]
    fn stale_handles_are_ignored() {
        let registry = DeviceRegistry::new();
        let first = registry.make_dev(DeviceSpec::sequencer()).unwrap();
        assert!(registry.destroy_dev(&first));
        let second = registry.make_dev(DeviceSpec::sequencer()).unwrap();
        assert!(!registry.destroy_dev(&first));
        assert!(registry.is_live(&second));
    }

    #[test]
    fn flags_combine() {
        let flags = MakeDevFlags::CHECKNAME | MakeDevFlags::WAITOK;
        assert!(flags.contains(MakeDevFlags::CHECKNAME));
        assert!(flags.contains(MakeDevFlags::WAITOK));
        assert_eq!(flags.bits(), 0x28);
        assert!(!MakeDevFlags::empty().contains(MakeDevFlags::WAITOK));
        assert_eq!(MakeDevFlags::from_bits(0x28), Some(flags));
        assert_eq!(MakeDevFlags::from_bits(0x01), None);
    }
}
