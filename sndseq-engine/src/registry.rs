//! # Operation Registry
//!
//! Purpose: Map exact command words to named operations and their response
//! rules.
//!
//! ## Design Principles
//!
//! 1. **Table as Data**: Operations are rows in `OPERATIONS`; adding one never
//!    adds a decode branch.
//! 2. **Exact Match**: Lookup keys are full command words. Direction and size
//!    bits are part of the identity.
//! 3. **Frozen at Start**: The global registry is built on first use and never
//!    mutated, so lookups need no locking.

use std::sync::LazyLock;

use hashbrown::HashMap;
use sndseq_common::ioctl::*;
use sndseq_common::{ClientId, ProtocolVersion};

use crate::encoder::{Probe, Response};

/// Semantic operations known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ProtocolVersion,
    ClientId,
    SetClientName,
    CreatePort,
    CreateQueue,
    OpenPort,
    SetTempo,
    SyncOutput,
}

/// How an operation answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRule {
    /// Write the packed protocol version.
    Version(ProtocolVersion),
    /// Write the caller's client identifier.
    ClientId(ClientId),
    /// Accept without writing; the probe selects the request bytes to log.
    Acknowledge(Probe),
}

impl ResponseRule {
    pub const fn response(self) -> Response {
        match self {
            ResponseRule::Version(version) => Response::Word(version.packed()),
            ResponseRule::ClientId(id) => Response::Word(id.0),
            ResponseRule::Acknowledge(_) => Response::Acknowledge,
        }
    }
}

/// Static description of one registered command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub code: IoctlCode,
    /// Name used in diagnostics.
    pub name: &'static str,
    pub operation: Operation,
    pub rule: ResponseRule,
}

impl OperationDescriptor {
    const fn new(
        code: IoctlCode,
        name: &'static str,
        operation: Operation,
        rule: ResponseRule,
    ) -> Self {
        OperationDescriptor { code, name, operation, rule }
    }

    /// Payload size the caller's buffer is expected to have.
    ///
    /// Derived from the command word so the declared and handled sizes agree.
    pub const fn expected_size(&self) -> usize {
        self.code.size()
    }
}

const ACK_BYTE: ResponseRule = ResponseRule::Acknowledge(Probe::FirstByte);

/// Every command word the emulated device answers.
pub const OPERATIONS: &[OperationDescriptor] = &[
    OperationDescriptor::new(
        SEQ_IOCTL_PVERSION,
        "pversion",
        Operation::ProtocolVersion,
        ResponseRule::Version(ProtocolVersion::CURRENT),
    ),
    OperationDescriptor::new(
        SEQ_IOCTL_CLIENT_ID,
        "client_id",
        Operation::ClientId,
        ResponseRule::ClientId(ClientId::FIXED),
    ),
    OperationDescriptor::new(SEQ_IOCTL_CLIENT_NAME_RW, "set_client_name", Operation::SetClientName, ACK_BYTE),
    OperationDescriptor::new(SEQ_IOCTL_CLIENT_NAME_W, "set_client_name_w", Operation::SetClientName, ACK_BYTE),
    OperationDescriptor::new(SEQ_IOCTL_CREATE_PORT, "create_port", Operation::CreatePort, ACK_BYTE),
    OperationDescriptor::new(SEQ_IOCTL_CREATE_QUEUE, "create_queue", Operation::CreateQueue, ACK_BYTE),
    OperationDescriptor::new(SEQ_IOCTL_OPEN_PORT, "open_port", Operation::OpenPort, ACK_BYTE),
    OperationDescriptor::new(
        SEQ_IOCTL_SET_TEMPO,
        "set_tempo",
        Operation::SetTempo,
        ResponseRule::Acknowledge(Probe::Word),
    ),
    OperationDescriptor::new(SEQ_IOCTL_SYNC_OUTPUT_RW, "sync_output", Operation::SyncOutput, ACK_BYTE),
    OperationDescriptor::new(SEQ_IOCTL_SYNC_OUTPUT_W, "sync_output_w", Operation::SyncOutput, ACK_BYTE),
];

static GLOBAL: LazyLock<Registry> = LazyLock::new(|| Registry::from_table(OPERATIONS));

/// Read-only lookup table from command word to operation.
#[derive(Debug)]
pub struct Registry {
    by_code: HashMap<IoctlCode, &'static OperationDescriptor, ahash::RandomState>,
}

impl Registry {
    /// Builds a registry from a static table.
    ///
    /// When a word appears twice the first row wins.
    pub fn from_table(table: &'static [OperationDescriptor]) -> Self {
        let mut by_code =
            HashMap::with_capacity_and_hasher(table.len(), ahash::RandomState::new());
        for descriptor in table {
            by_code.entry(descriptor.code).or_insert(descriptor);
        }
        Registry { by_code }
    }

    /// Process-wide registry built from `OPERATIONS`.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Resolves a command word; `None` means unrecognized.
    pub fn resolve(&self, code: IoctlCode) -> Option<&'static OperationDescriptor> {
        self.by_code.get(&code).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Iterates over the registered descriptors in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &'static OperationDescriptor> + '_ {
        self.by_code.values().copied()
    }
}
