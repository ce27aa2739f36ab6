// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The narrow, stable outward contract (spec.md §4.6). A `Callbacks`
//! implementor gets exactly one synchronous call per observable state
//! change; every method has a no-op default so callers only override the
//! events they care about — the idiomatic replacement for the C
//! implementation's null-checked table of optional function pointers.

use crate::interface::Interface;
use crate::network::Network;

pub trait Callbacks: Send + Sync {
    /// After the first successful root `GetAll` terminator. Idempotent:
    /// the replica suppresses a repeat call while already ready.
    fn system_ready(&self) {}

    /// After peer loss, or on unregister if the peer was available.
    fn system_killed(&self) {}

    /// Once per interface, after its first full property bag is applied.
    fn interface_added(&self, _iface: &Interface) {}

    /// Before the interface's memory is freed, after its networks/BSSs have
    /// already emitted their own removal callbacks.
    fn interface_removed(&self, _iface: &Interface) {}

    fn scan_started(&self, _iface: &Interface) {}
    fn scan_finished(&self, _iface: &Interface) {}

    fn network_added(&self, _net: &Network) {}
    fn network_removed(&self, _net: &Network) {}
}

/// A [`Callbacks`] implementation that observes nothing — the replica's
/// default before [`crate::replica::Replica::register`] installs a real one.
#[derive(Debug, Default)]
pub struct NullCallbacks;

impl Callbacks for NullCallbacks {}
