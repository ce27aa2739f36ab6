// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The outward handle for control operations (spec.md §4.7): a cheap,
//! cloneable front for the router task's command channel. Every operation
//! returns immediately with a future that resolves once the router has
//! actually completed the RPC, replacing the original completion-callback-
//! plus-userdata pair with a plain `async fn`.

use tokio::sync::{mpsc, oneshot};

use crate::error::Error;
use crate::interface::Interface;
use crate::router::ControlCommand;

/// A debug verbosity level understood by `set_debug_level` (spec.md §4.7).
/// Maps onto the peer's `DebugParams` property, whose first element is a
/// numeric level (see `router::debug_level_to_wire`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugLevel {
    MsgDump,
    Debug,
    Info,
    Warning,
    Error,
}

impl DebugLevel {
    fn as_wire(&self) -> &'static str {
        match self {
            DebugLevel::MsgDump => "msgdump",
            DebugLevel::Debug => "debug",
            DebugLevel::Info => "info",
            DebugLevel::Warning => "warning",
            DebugLevel::Error => "error",
        }
    }
}

/// Submits [`ControlCommand`]s to the router task that owns the replica.
/// Cloning this is cheap (it's just a channel sender) and every clone
/// reaches the same router.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: mpsc::Sender<ControlCommand>,
}

impl ControlHandle {
    pub(crate) fn new(commands: mpsc::Sender<ControlCommand>) -> Self {
        ControlHandle { commands }
    }

    /// `supplicant_interface_create`: resolves to the peer's existing
    /// interface for `ifname` via `GetInterface`, falling back to
    /// `CreateInterface` with `driver` only if none exists yet. Fails with
    /// [`Error::PeerUnavailable`] if the peer is not on the bus.
    pub async fn interface_create(&self, ifname: &str, driver: &str) -> Result<Interface, Error> {
        let (reply, rx) = oneshot::channel();
        self.send(
            ControlCommand::InterfaceCreate {
                ifname: ifname.to_string(),
                driver: driver.to_string(),
                reply,
            },
            rx,
        )
        .await
    }

    /// `supplicant_interface_scan`: requests a passive scan on an already
    /// known interface.
    pub async fn interface_scan(&self, iface_path: &str) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlCommand::InterfaceScan { iface_path: iface_path.to_string(), reply }, rx)
            .await
    }

    /// `supplicant_interface_disconnect`.
    pub async fn interface_disconnect(&self, iface_path: &str) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(
            ControlCommand::InterfaceDisconnect { iface_path: iface_path.to_string(), reply },
            rx,
        )
        .await
    }

    /// `supplicant_set_debug_level`.
    pub async fn set_debug_level(
        &self,
        level: DebugLevel,
        timestamp: bool,
        show_keys: bool,
    ) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.send(
            ControlCommand::SetDebugLevel {
                level: level.as_wire().to_string(),
                timestamp,
                show_keys,
                reply,
            },
            rx,
        )
        .await
    }

    /// `supplicant_unregister`'s transport: tears the replica down and
    /// waits for the router to acknowledge before the caller joins it.
    pub(crate) async fn unregister(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(ControlCommand::Unregister { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn send<T>(
        &self,
        command: ControlCommand,
        rx: oneshot::Receiver<Result<T, Error>>,
    ) -> Result<T, Error> {
        if self.commands.send(command).await.is_err() {
            return Err(Error::PeerUnavailable);
        }
        rx.await.unwrap_or(Err(Error::PeerUnavailable))
    }
}
