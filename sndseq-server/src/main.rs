//! # SndSeq Device Shell
//!
//! Load the emulated `snd/seq` module and serve its device surface to local
//! callers over the bridge protocol.
//!
//! ## Design Principles
//!
//! 1. **Single Responsibility**: Framing, sessions and dispatch live in
//!    separate modules.
//! 2. **Async First**: Tokio handles concurrent sessions.
//! 3. **Clean Lifecycle**: The node is created before the listener opens and
//!    destroyed after it stops.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sndseq_engine::Dispatcher;
use sndseq_server::config::ShellConfig;
use sndseq_server::device::{DeviceRegistry, ModuleEvent, SeqModule};
use sndseq_server::metrics::Metrics;
use sndseq_server::server;
use sndseq_server::session::DeviceShell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ShellConfig::from_env().context("loading configuration")?;

    let module = Arc::new(SeqModule::new(
        Arc::new(DeviceRegistry::new()),
        config.device_spec(),
    ));
    module
        .handle_event(ModuleEvent::Load)
        .with_context(|| format!("creating device node '{}'", config.device))?;

    let metrics = Arc::new(Metrics::new());
    let shell = Arc::new(DeviceShell::new(
        Arc::clone(&module),
        Dispatcher::new(),
        Arc::clone(&metrics),
    ));

    let listener = server::bind(config.addr)
        .with_context(|| format!("binding bridge listener on {}", config.addr))?;
    info!(addr = %config.addr, device = %config.device, "sndseq bridge listening");

    let served = server::serve(
        listener,
        shell,
        server::shutdown_on(tokio::signal::ctrl_c()),
    )
    .await;

    module.handle_event(ModuleEvent::Unload)?;

    let snapshot = metrics.snapshot();
    info!(
        ioctls = snapshot.ioctls_total,
        rejected = snapshot.ioctls_rejected,
        bytes_written = snapshot.bytes_written,
        latency_samples = snapshot.latency.samples,
        latency_sum_us = snapshot.latency.sum_us,
        "sndseq bridge stopped"
    );

    served.context("serving bridge connections")
}
