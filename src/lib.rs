// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A client library that tracks the live state of a host's wireless
//! networking daemon (the wpa_supplicant peer, reached over the system
//! D-Bus) and exposes a stable, coalesced object model of wireless
//! interfaces, BSSs, and networks to an upper connection-manager layer.
//!
//! [`Supplicant::connect`] spawns the single task that owns the replica and
//! speaks to the peer; everything else — [`Interface`], [`Network`],
//! [`Bss`] — is reached only through the [`Callbacks`] trait supplied at
//! connect time, per the "single dispatcher, no locks" concurrency model.

pub mod bss;
pub mod callbacks;
pub mod control;
pub mod error;
pub mod ie;
pub mod interface;
pub mod network;
pub mod replica;
pub mod router;
pub mod transport;
pub mod types;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;
use zbus::Connection;

pub use bss::Bss;
pub use callbacks::{Callbacks, NullCallbacks};
pub use control::{ControlHandle, DebugLevel};
pub use error::Error;
pub use interface::{Capabilities, Interface};
pub use network::Network;

use replica::Replica;

/// Depth of the control-command queue feeding the router task. A handful
/// of in-flight operations is normal; this just bounds a runaway caller.
const CONTROL_CHANNEL_DEPTH: usize = 32;

/// A live connection to the supplicant peer. Dropping this leaves the
/// router task running with no further commands accepted; call
/// [`Supplicant::unregister`] for the documented `system_killed`-on-
/// teardown behavior instead of relying on `Drop`.
pub struct Supplicant {
    control: ControlHandle,
    router_task: JoinHandle<Result<(), Error>>,
}

impl Supplicant {
    /// `supplicant_register`: connects to the system bus, installs
    /// `callbacks`, and spawns the router task that bootstraps the
    /// replica and begins demultiplexing signals. Matches the upward API's
    /// `0 | EIO` shape: the only failure mode here is the initial bus
    /// connection itself.
    pub async fn connect(callbacks: Arc<dyn Callbacks>) -> Result<Self, Error> {
        let connection = Connection::system().await?;

        let mut replica = Replica::new();
        replica.register(callbacks);

        let (commands_tx, commands_rx) = mpsc::channel(CONTROL_CHANNEL_DEPTH);
        let router_task = tokio::spawn(router::run(connection, replica, commands_rx));

        Ok(Supplicant { control: ControlHandle::new(commands_tx), router_task })
    }

    /// A cheap, cloneable handle for issuing control operations from other
    /// tasks without holding the `Supplicant` itself.
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// `supplicant_interface_create`.
    pub async fn interface_create(&self, ifname: &str, driver: &str) -> Result<Interface, Error> {
        self.control.interface_create(ifname, driver).await
    }

    /// `supplicant_interface_remove`: currently a no-op success, matching
    /// spec.md §6 — the peer has no corresponding RPC to destroy a managed
    /// interface, only to create one.
    pub async fn interface_remove(&self, _iface_path: &str) -> Result<(), Error> {
        Ok(())
    }

    /// `supplicant_interface_scan`.
    pub async fn interface_scan(&self, iface_path: &str) -> Result<(), Error> {
        self.control.interface_scan(iface_path).await
    }

    /// `supplicant_interface_disconnect`.
    pub async fn interface_disconnect(&self, iface_path: &str) -> Result<(), Error> {
        self.control.interface_disconnect(iface_path).await
    }

    /// `supplicant_set_debug_level`: void and a no-op if the peer is
    /// unavailable, per spec.md §6 — failures are logged, not surfaced.
    pub async fn set_debug_level(&self, level: DebugLevel, timestamp: bool, show_keys: bool) {
        if let Err(e) = self.control.set_debug_level(level, timestamp, show_keys).await {
            warn!(error = %e, "set_debug_level failed");
        }
    }

    /// `supplicant_unregister`: tears the replica down (emitting
    /// `system_killed` first if the peer was available), then waits for
    /// the router task to exit.
    pub async fn unregister(self) -> Result<(), Error> {
        self.control.unregister().await;
        self.router_task.await.map_err(|_| Error::PeerUnavailable)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_callbacks_never_panics() {
        let cb = NullCallbacks;
        cb.system_ready();
        cb.system_killed();
    }
}
