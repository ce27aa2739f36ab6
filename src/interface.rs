// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! One record per managed wireless interface: capability sets, operational
//! state, and the owned BSS/network tables (spec.md §4.4).

use tracing::debug;

use crate::bss::Bss;
use crate::network::{NetworkEvent, NetworkIndex};
use crate::types::{AuthAlg, GroupCipher, KeyMgmt, ModeCapa, PairwiseCipher, Protocol, ScanCapa, State};

/// One value out of the top-level interface property bag. `Capabilities`
/// nests another bag keyed by capability class, each carrying an array of
/// strings (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum IfaceValue {
    Str(String),
    Bool(bool),
    Int(i32),
    Paths(Vec<String>),
    Capabilities(Vec<(String, Vec<String>)>),
}

/// Raised while applying the top-level bag; the signal router uses these to
/// know which further RPCs to issue (e.g. `GetAll` on a freshly-seen BSS
/// path) without the interface tracker itself touching the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceEvent {
    /// A BSS path appeared in `CurrentBSS` or `BSSs` and has not yet been
    /// fully populated.
    BssPathSeen(String),
    ScanStarted,
    NetworkAdded(String),
    NetworkRemoved(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub key_mgmt: KeyMgmt,
    pub auth_alg: AuthAlg,
    pub protocol: Protocol,
    pub group: GroupCipher,
    pub pairwise: PairwiseCipher,
    pub scan: ScanCapa,
    pub modes: ModeCapa,
}

#[derive(Debug, Default, Clone)]
pub struct Interface {
    pub path: String,
    pub ifname: String,
    pub driver: String,
    pub bridge: String,
    pub capabilities: Capabilities,
    pub state: State,
    pub scanning: bool,
    pub apscan: i32,
    pub networks: NetworkIndex,
    /// Set once `interface_added` has fired for this interface, so a
    /// replica bug can never double-announce it.
    pub(crate) added_announced: bool,
}

impl Interface {
    pub fn new(path: String) -> Self {
        Interface { path, ..Default::default() }
    }

    /// Applies one top-level key from the interface's property bag,
    /// returning any events the signal router must act on. Robust to any
    /// subset/order of keys (§4.4); the sentinel itself is not modeled here
    /// — the caller emits `interface_added` once the whole bag has been
    /// consumed (see [`crate::replica::Replica::apply_interface_bag`]).
    pub fn apply(&mut self, key: &str, value: &IfaceValue) -> Vec<InterfaceEvent> {
        match (key, value) {
            ("State", IfaceValue::Str(s)) => {
                self.state = State::from_wire(s);
                vec![]
            }
            ("Scanning", IfaceValue::Bool(b)) => {
                self.scanning = *b;
                if *b {
                    vec![InterfaceEvent::ScanStarted]
                } else {
                    vec![]
                }
            }
            ("ApScan", IfaceValue::Int(n)) => {
                self.apscan = *n;
                vec![]
            }
            ("Ifname", IfaceValue::Str(s)) => {
                self.ifname = s.clone();
                vec![]
            }
            ("Driver", IfaceValue::Str(s)) => {
                self.driver = s.clone();
                vec![]
            }
            ("BridgeIfname", IfaceValue::Str(s)) => {
                self.bridge = s.clone();
                vec![]
            }
            ("Capabilities", IfaceValue::Capabilities(classes)) => {
                self.apply_capabilities(classes);
                vec![]
            }
            ("CurrentBSS", IfaceValue::Str(path)) if path != "/" => {
                vec![InterfaceEvent::BssPathSeen(path.clone())]
            }
            ("CurrentBSS", IfaceValue::Str(_)) => vec![],
            ("CurrentNetwork", IfaceValue::Str(path)) if path != "/" => {
                vec![InterfaceEvent::NetworkAdded(path.clone())]
            }
            ("CurrentNetwork", IfaceValue::Str(_)) => vec![],
            ("BSSs", IfaceValue::Paths(paths)) => paths
                .iter()
                .filter(|p| p.as_str() != "/")
                .cloned()
                .map(InterfaceEvent::BssPathSeen)
                .collect(),
            ("Networks", IfaceValue::Paths(_)) => vec![],
            ("Blobs", _) => vec![],
            (other, _) => {
                debug!(key = other, "interface property: unrecognized key");
                vec![]
            }
        }
    }

    fn apply_capabilities(&mut self, classes: &[(String, Vec<String>)]) {
        for (class, values) in classes {
            match class.as_str() {
                "KeyMgmt" => {
                    for v in values {
                        if let Some(bit) = KeyMgmt::from_wire(v) {
                            self.capabilities.key_mgmt |= bit;
                        }
                    }
                }
                "AuthAlg" => {
                    for v in values {
                        if let Some(bit) = AuthAlg::from_wire(v) {
                            self.capabilities.auth_alg |= bit;
                        }
                    }
                }
                "Protocol" => {
                    for v in values {
                        if let Some(bit) = Protocol::from_wire(v) {
                            self.capabilities.protocol |= bit;
                        }
                    }
                }
                "Group" => {
                    for v in values {
                        if let Some(bit) = GroupCipher::from_wire(v) {
                            self.capabilities.group |= bit;
                        }
                    }
                }
                "Pairwise" => {
                    for v in values {
                        if let Some(bit) = PairwiseCipher::from_wire(v) {
                            self.capabilities.pairwise |= bit;
                        }
                    }
                }
                "Scan" => {
                    for v in values {
                        if let Some(bit) = ScanCapa::from_wire(v) {
                            self.capabilities.scan |= bit;
                        }
                    }
                }
                "Modes" => {
                    for v in values {
                        if let Some(bit) = ModeCapa::from_wire(v) {
                            self.capabilities.modes |= bit;
                        }
                    }
                }
                other => debug!(class = other, "interface capability: unrecognized class"),
            }
        }
        debug!(capabilities = ?self.capabilities, "interface capabilities parsed");
    }

    /// §4.2/§4.3: hands a fully-built BSS to the network indexer, returning
    /// a network-added/removed event if one resulted.
    pub fn add_bss(&mut self, bss: Bss) -> Option<NetworkEvent> {
        self.networks.insert(&self.path.clone(), bss)
    }

    /// §4.3 removal: no-op if the BSS was never indexed.
    pub fn remove_bss(&mut self, bss_path: &str) -> Option<NetworkEvent> {
        self.networks.remove(bss_path)
    }

    /// True if `bss_path` is already tracked — used by the router to make
    /// `BSSAdded` idempotent per spec.md §4.5.
    pub fn has_bss(&self, bss_path: &str) -> bool {
        self.networks.network_for_bss(bss_path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanning_true_emits_scan_started() {
        let mut iface = Interface::new("/iface/0".into());
        let events = iface.apply("Scanning", &IfaceValue::Bool(true));
        assert_eq!(events, vec![InterfaceEvent::ScanStarted]);
        assert!(iface.scanning);
    }

    #[test]
    fn scanning_false_emits_nothing() {
        let mut iface = Interface::new("/iface/0".into());
        let events = iface.apply("Scanning", &IfaceValue::Bool(false));
        assert!(events.is_empty());
    }

    #[test]
    fn capabilities_unknown_strings_ignored() {
        let mut iface = Interface::new("/iface/0".into());
        iface.apply(
            "Capabilities",
            &IfaceValue::Capabilities(vec![(
                "KeyMgmt".into(),
                vec!["wpa-psk".into(), "made-up".into()],
            )]),
        );
        assert_eq!(iface.capabilities.key_mgmt, KeyMgmt::WPA_PSK);
    }

    #[test]
    fn null_object_path_ignored_everywhere() {
        let mut iface = Interface::new("/iface/0".into());
        assert!(iface.apply("CurrentBSS", &IfaceValue::Str("/".into())).is_empty());
        assert!(iface.apply("CurrentNetwork", &IfaceValue::Str("/".into())).is_empty());
        let events = iface.apply(
            "BSSs",
            &IfaceValue::Paths(vec!["/".into(), "/bss/1".into()]),
        );
        assert_eq!(events, vec![InterfaceEvent::BssPathSeen("/bss/1".into())]);
    }

    #[test]
    fn unknown_top_level_key_does_not_panic() {
        let mut iface = Interface::new("/iface/0".into());
        let events = iface.apply("SomethingNew", &IfaceValue::Bool(true));
        assert!(events.is_empty());
    }
}
