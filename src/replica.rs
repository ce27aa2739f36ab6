// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The process-wide `object_path -> Interface` map, bootstrap orchestrator,
//! and peer-loss/peer-return handling (spec.md §4.5). This module is
//! transport-agnostic: it is driven by decoded events, not by `zbus`
//! directly, so it can be exercised without a live bus connection — the
//! concrete D-Bus plumbing lives in `transport.rs`/`router.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::bss::Bss;
use crate::callbacks::{Callbacks, NullCallbacks};
use crate::error::Error;
use crate::interface::{IfaceValue, Interface, InterfaceEvent};
use crate::types::EapMethods;

/// The "null object" path: signals and property payloads carrying it are
/// ignored everywhere (spec.md §4.5).
pub const NULL_PATH: &str = "/";

#[derive(Debug, Default)]
pub struct Replica {
    interfaces: HashMap<String, Interface>,
    eap_methods: EapMethods,
    available: bool,
    ready: bool,
    callbacks: Option<Arc<dyn Callbacks>>,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn eap_methods(&self) -> EapMethods {
        self.eap_methods
    }

    pub fn interface(&self, path: &str) -> Option<&Interface> {
        self.interfaces.get(path)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    fn callbacks(&self) -> Arc<dyn Callbacks> {
        self.callbacks.clone().unwrap_or_else(|| Arc::new(NullCallbacks))
    }

    /// `supplicant_register`: installs the callback table. Matches the
    /// upward API's `0 | EIO` shape, though in practice installing a
    /// callback table never fails in this implementation.
    pub fn register(&mut self, callbacks: Arc<dyn Callbacks>) {
        self.callbacks = Some(callbacks);
    }

    /// `supplicant_unregister`: clears the callback table, emitting
    /// `system_killed` first if the peer was still available (spec.md §4.6).
    pub fn unregister(&mut self) {
        if self.available {
            self.tear_down();
        }
        self.callbacks = None;
    }

    // --- Bootstrap --------------------------------------------------

    /// Peer detected on the bus: begin bootstrap. Does not by itself emit
    /// `system_ready` — that happens once the root `GetAll` terminator is
    /// reached, via [`Self::root_bootstrap_done`].
    pub fn begin_bootstrap(&mut self) {
        self.available = true;
    }

    pub fn set_eap_methods(&mut self, methods: EapMethods) {
        self.eap_methods = methods;
    }

    /// Root `GetAll` terminator: emits `system_ready`, idempotently.
    pub fn root_bootstrap_done(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        self.callbacks().system_ready();
    }

    // --- Interfaces ---------------------------------------------------

    /// Adopts an existing interface record or allocates a fresh one,
    /// ready to receive its property bag (§4.5 bootstrap, §4.4
    /// `InterfaceAdded`/`InterfaceCreated`).
    pub fn ensure_interface(&mut self, path: &str) -> &mut Interface {
        self.interfaces.entry(path.to_string()).or_insert_with(|| Interface::new(path.to_string()))
    }

    pub fn apply_interface_property(
        &mut self,
        path: &str,
        key: &str,
        value: &IfaceValue,
    ) -> Vec<InterfaceEvent> {
        if path == NULL_PATH {
            return vec![];
        }
        self.ensure_interface(path).apply(key, value)
    }

    /// §4.4 terminator: emits `interface_added` exactly once per interface.
    pub fn finish_interface_bag(&mut self, path: &str) {
        if let Some(iface) = self.interfaces.get_mut(path) {
            if iface.added_announced {
                return;
            }
            iface.added_announced = true;
            // SAFETY-free: re-borrow immutably for the callback after the
            // mutation above, since `Callbacks` only takes a shared ref.
        }
        if let Some(iface) = self.interfaces.get(path) {
            self.callbacks().interface_added(iface);
        }
    }

    /// `InterfaceRemoved`, or called once per surviving interface during
    /// peer loss: emits `network_removed` for every network still owned by
    /// the interface, then `interface_removed`, mirroring the destructor
    /// cascade that tears down `network_table` before the interface record
    /// itself is freed.
    pub fn remove_interface(&mut self, path: &str) {
        if path == NULL_PATH {
            return;
        }
        if let Some(iface) = self.interfaces.remove(path) {
            self.cascade_interface_removal(&iface);
        }
    }

    /// Emits `network_removed` for every network the interface still owns,
    /// then `interface_removed`, for a record that's already out of
    /// `self.interfaces`.
    fn cascade_interface_removal(&self, iface: &Interface) {
        for net in iface.networks.networks() {
            self.callbacks().network_removed(net);
        }
        self.callbacks().interface_removed(iface);
    }

    // --- BSS / network plumbing ---------------------------------------

    /// `BSSAdded`: a no-op if the BSS is already indexed (§4.5 idempotency).
    pub fn bss_added(&mut self, iface_path: &str, bss: Bss) {
        let Some(iface) = self.interfaces.get_mut(iface_path) else {
            debug!(iface_path, "BSSAdded for unknown interface");
            return;
        };
        if iface.has_bss(&bss.path) {
            return;
        }
        if let Some(event) = iface.add_bss(bss) {
            self.emit_network_event(iface_path, event);
        }
    }

    /// `BSSRemoved`: ignored if the path was never indexed.
    pub fn bss_removed(&mut self, iface_path: &str, bss_path: &str) {
        let Some(iface) = self.interfaces.get_mut(iface_path) else {
            return;
        };
        if let Some(event) = iface.remove_bss(bss_path) {
            self.emit_network_event(iface_path, event);
        }
    }

    fn emit_network_event(&self, iface_path: &str, event: crate::network::NetworkEvent) {
        match event {
            crate::network::NetworkEvent::Added(group) => {
                let Some(iface) = self.interfaces.get(iface_path) else { return };
                if let Some(net) = iface.networks.network(&group) {
                    self.callbacks().network_added(net);
                }
            }
            crate::network::NetworkEvent::Removed(net) => {
                self.callbacks().network_removed(&net);
            }
        }
    }

    pub fn scan_done(&mut self, iface_path: &str) {
        if let Some(iface) = self.interfaces.get(iface_path) {
            self.callbacks().scan_finished(iface);
        }
    }

    /// Forwards an [`InterfaceEvent::ScanStarted`] raised while applying a
    /// property bag. Exists so the router doesn't need to know about
    /// `Callbacks` directly.
    pub fn scan_started(&mut self, iface_path: &str) {
        if let Some(iface) = self.interfaces.get(iface_path) {
            self.callbacks().scan_started(iface);
        }
    }

    // --- Peer lifecycle --------------------------------------------------

    /// `NameOwnerChanged(old=non-empty, new=empty)`: bulk-destroys the
    /// replica and emits `system_killed` (invariant 4: the replica is empty
    /// afterwards).
    pub fn peer_lost(&mut self) {
        if !self.available {
            return;
        }
        info!("supplicant peer lost");
        self.tear_down();
    }

    fn tear_down(&mut self) {
        let paths: Vec<String> = self.interfaces.keys().cloned().collect();
        for path in paths {
            if let Some(iface) = self.interfaces.remove(&path) {
                self.cascade_interface_removal(&iface);
            }
        }
        self.available = false;
        self.ready = false;
        self.eap_methods = EapMethods::empty();
        self.callbacks().system_killed();
    }

    /// `NameOwnerChanged(old=empty, new=non-empty)`: re-run bootstrap. The
    /// caller (router) is responsible for actually issuing the `GetAll`
    /// RPCs; this just clears the way.
    pub fn peer_returned(&mut self) {
        info!("supplicant peer returned");
        self.begin_bootstrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bss::Bss;
    use crate::types::{Mode, Security};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Callbacks for Recorder {
        fn system_ready(&self) {
            self.events.lock().unwrap().push("system_ready".into());
        }
        fn system_killed(&self) {
            self.events.lock().unwrap().push("system_killed".into());
        }
        fn interface_added(&self, iface: &Interface) {
            self.events.lock().unwrap().push(format!("interface_added:{}", iface.path));
        }
        fn interface_removed(&self, iface: &Interface) {
            self.events.lock().unwrap().push(format!("interface_removed:{}", iface.path));
        }
        fn scan_started(&self, iface: &Interface) {
            self.events.lock().unwrap().push(format!("scan_started:{}", iface.path));
        }
        fn scan_finished(&self, iface: &Interface) {
            self.events.lock().unwrap().push(format!("scan_finished:{}", iface.path));
        }
        fn network_added(&self, net: &crate::network::Network) {
            self.events.lock().unwrap().push(format!("network_added:{}", net.group));
        }
        fn network_removed(&self, net: &crate::network::Network) {
            self.events.lock().unwrap().push(format!("network_removed:{}", net.group));
        }
    }

    fn bss(path: &str, ssid: &[u8]) -> Bss {
        let mut b = Bss { path: path.into(), mode: Mode::Infra, security: Security::Psk, ..Bss::default() };
        b.ssid[..ssid.len()].copy_from_slice(ssid);
        b.ssid_len = ssid.len();
        b
    }

    #[test]
    fn system_ready_is_idempotent() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.begin_bootstrap();
        replica.root_bootstrap_done();
        replica.root_bootstrap_done();
        let events = rec.events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| *e == "system_ready").count(), 1);
    }

    #[test]
    fn interface_added_fires_once_after_sentinel() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.apply_interface_property("/iface/0", "Ifname", &IfaceValue::Str("wlan0".into()));
        replica.finish_interface_bag("/iface/0");
        replica.finish_interface_bag("/iface/0");
        let events = rec.events.lock().unwrap();
        assert_eq!(
            events.iter().filter(|e| e.starts_with("interface_added")).count(),
            1
        );
    }

    #[test]
    fn bss_added_is_idempotent_and_networks_track_it() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.ensure_interface("/iface/0");
        replica.finish_interface_bag("/iface/0");

        replica.bss_added("/iface/0", bss("/bss/0", b"Guest"));
        replica.bss_added("/iface/0", bss("/bss/0", b"Guest"));

        let events = rec.events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| e.starts_with("network_added")).count(), 1);
        let iface = replica.interface("/iface/0").unwrap();
        assert_eq!(iface.networks.networks().count(), 1);
    }

    #[test]
    fn peer_loss_empties_replica_and_emits_system_killed() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.begin_bootstrap();
        replica.ensure_interface("/iface/0");
        replica.finish_interface_bag("/iface/0");
        replica.root_bootstrap_done();

        replica.peer_lost();

        assert!(replica.interfaces().next().is_none());
        assert!(!replica.is_available());
        assert!(!replica.is_ready());
        let events = rec.events.lock().unwrap();
        assert!(events.contains(&"system_killed".to_string()));
        assert!(events.contains(&"interface_removed:/iface/0".to_string()));
    }

    #[test]
    fn remove_interface_cascades_network_removed_before_interface_removed() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.ensure_interface("/iface/0");
        replica.finish_interface_bag("/iface/0");
        replica.bss_added("/iface/0", bss("/bss/0", b"Guest"));

        replica.remove_interface("/iface/0");

        assert!(replica.interface("/iface/0").is_none());
        let events = rec.events.lock().unwrap();
        let net_removed = events.iter().position(|e| e.starts_with("network_removed")).unwrap();
        let iface_removed = events.iter().position(|e| e.starts_with("interface_removed")).unwrap();
        assert!(net_removed < iface_removed, "network_removed must precede interface_removed");
    }

    #[test]
    fn peer_loss_cascades_network_removed_for_live_networks() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.begin_bootstrap();
        replica.ensure_interface("/iface/0");
        replica.finish_interface_bag("/iface/0");
        replica.bss_added("/iface/0", bss("/bss/0", b"Guest"));
        replica.root_bootstrap_done();

        replica.peer_lost();

        assert!(replica.interfaces().next().is_none());
        let events = rec.events.lock().unwrap();
        let net_removed = events.iter().position(|e| e.starts_with("network_removed")).unwrap();
        let iface_removed = events.iter().position(|e| e.starts_with("interface_removed")).unwrap();
        let killed = events.iter().position(|e| e == "system_killed").unwrap();
        assert!(net_removed < iface_removed, "network_removed must precede interface_removed");
        assert!(iface_removed < killed, "interface_removed must precede system_killed");
    }

    #[test]
    fn peer_return_rebootstraps() {
        let rec = Arc::new(Recorder::default());
        let mut replica = Replica::new();
        replica.register(rec.clone());
        replica.begin_bootstrap();
        replica.root_bootstrap_done();
        replica.peer_lost();

        replica.peer_returned();
        replica.root_bootstrap_done();

        let events = rec.events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| *e == "system_ready").count(), 2);
    }

    #[test]
    fn null_path_is_ignored_for_interface_removal() {
        let mut replica = Replica::new();
        replica.remove_interface(NULL_PATH);
        assert!(replica.interfaces().next().is_none());
    }

    #[test]
    fn removing_unknown_interface_does_not_panic() {
        let mut replica = Replica::new();
        replica.remove_interface("/iface/does-not-exist");
    }
}
