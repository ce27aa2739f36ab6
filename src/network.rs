// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fingerprints BSSs into the logical "network" (SSID/mode/security)
//! equivalence classes, and maintains the bidirectional indices between an
//! interface's BSSs and its networks (spec.md §4.3).

use std::collections::HashMap;

use crate::bss::Bss;
use crate::types::{Mode, Security};

/// A logical Wi-Fi network: the equivalence class of BSSs sharing
/// `(ssid, mode, security)`. `group` and `name` are fixed at creation time
/// and never revised by later BSSs (they're identical by construction of
/// the group key).
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub group: String,
    pub name: String,
    pub mode: Mode,
    /// Non-owning back-reference to the owning interface, resolved back
    /// through the replica's top-level map at the moment of use rather
    /// than a `Weak`/`Rc` (spec.md §6 `interface` getter).
    pub iface_path: String,
    pub bss_table: HashMap<String, Bss>,
}

impl Network {
    fn new(group: String, name: String, mode: Mode, iface_path: String) -> Self {
        Network { group, name, mode, iface_path, bss_table: HashMap::new() }
    }

    /// Spec.md §6 `identifier` getter: the stable group key. An alias over
    /// the `group` field for callers that want the upward-API name.
    pub fn identifier(&self) -> &str {
        &self.group
    }

    /// Spec.md §6 `interface` getter: resolves the owning interface's
    /// object path. Look it up in [`crate::replica::Replica`] to reach the
    /// [`crate::interface::Interface`] itself — this type holds only the
    /// non-owning path, per §9's "arena + index" back-reference design.
    pub fn interface_path(&self) -> &str {
        &self.iface_path
    }
}

/// Deterministic fingerprint over `(ssid bytes, mode, security)` (§4.3).
/// Hidden or zero-first-byte SSIDs collapse to the literal `hidden`.
pub fn group_key(bss: &Bss) -> String {
    let ssid = bss.ssid_bytes();
    let mut key = if ssid.is_empty() || ssid[0] == 0 {
        String::from("hidden")
    } else {
        let mut s = String::with_capacity(ssid.len() * 2);
        for b in ssid {
            s.push_str(&format!("{:02x}", b));
        }
        s
    };
    if let Some(mode) = bss.mode.group_suffix() {
        key.push('_');
        key.push_str(mode);
    }
    if let Some(sec) = bss.security.group_suffix() {
        key.push('_');
        key.push_str(sec);
    }
    key
}

/// Printable display name derived from SSID bytes: printable-ASCII bytes
/// pass through, everything else becomes a space. Empty or hidden SSIDs
/// produce the empty string. Never used for identity.
pub fn display_name(bss: &Bss) -> String {
    let ssid = bss.ssid_bytes();
    if ssid.is_empty() || ssid[0] == 0 {
        return String::new();
    }
    ssid.iter()
        .map(|&b| if is_printable_ascii(b) { b as char } else { ' ' })
        .collect()
}

fn is_printable_ascii(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// Owns the `group -> Network` and `bss_path -> group` indices for one
/// interface. Lives inside [`crate::interface::Interface`]; kept as its own
/// type so the insertion/removal algorithm in §4.3 can be unit-tested
/// without a whole `Interface`.
#[derive(Debug, Default, Clone)]
pub struct NetworkIndex {
    network_table: HashMap<String, Network>,
    bss_mapping: HashMap<String, String>,
}

/// Emitted by [`NetworkIndex::insert`]/[`NetworkIndex::remove`] so the
/// interface tracker can forward them to the callback surface.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    Added(String),
    /// Carries the network as it stood the instant its last BSS left,
    /// since by the time this event is produced it's already gone from
    /// `network_table` — the callback needs a value, not a dangling lookup.
    Removed(Network),
}

impl NetworkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(&self, group: &str) -> Option<&Network> {
        self.network_table.get(group)
    }

    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.network_table.values()
    }

    pub fn network_for_bss(&self, bss_path: &str) -> Option<&Network> {
        self.bss_mapping.get(bss_path).and_then(|g| self.network_table.get(g))
    }

    /// §4.3 insertion algorithm. Idempotent: re-inserting a BSS with the
    /// same path just overwrites its record in place and never emits a
    /// second `Added` event.
    pub fn insert(&mut self, iface_path: &str, bss: Bss) -> Option<NetworkEvent> {
        let group = group_key(&bss);
        let mut event = None;

        let network = self.network_table.entry(group.clone()).or_insert_with(|| {
            event = Some(NetworkEvent::Added(group.clone()));
            Network::new(group.clone(), display_name(&bss), bss.mode, iface_path.to_string())
        });

        self.bss_mapping.insert(bss.path.clone(), group);
        network.bss_table.insert(bss.path.clone(), bss);
        event
    }

    /// §4.3 removal algorithm. A path absent from `bss_mapping` is ignored
    /// (idempotent against double-removal or removal of an unknown BSS).
    pub fn remove(&mut self, bss_path: &str) -> Option<NetworkEvent> {
        let group = self.bss_mapping.remove(bss_path)?;
        let network = self.network_table.get_mut(&group)?;
        network.bss_table.remove(bss_path);

        if network.bss_table.is_empty() {
            let removed = self.network_table.remove(&group)?;
            Some(NetworkEvent::Removed(removed))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Security;

    fn bss(path: &str, ssid: &[u8], mode: Mode, security: Security) -> Bss {
        let mut b = Bss { path: path.into(), mode, security, ..Bss::default() };
        b.ssid[..ssid.len()].copy_from_slice(ssid);
        b.ssid_len = ssid.len();
        b
    }

    #[test]
    fn group_key_matches_guest_psk_example() {
        let b = bss("/bss/0", b"Guest", Mode::Infra, Security::Psk);
        assert_eq!(group_key(&b), "4775657374_infra_psk");
        assert_eq!(display_name(&b), "Guest");
    }

    #[test]
    fn hidden_ssid_group_prefix() {
        let b = bss("/bss/0", b"", Mode::Infra, Security::None);
        assert_eq!(group_key(&b), "hidden_infra_none");
        assert_eq!(display_name(&b), "");
    }

    #[test]
    fn same_triple_shares_network_different_triple_does_not() {
        let mut idx = NetworkIndex::new();
        let a = bss("/bss/a", b"Home", Mode::Infra, Security::Psk);
        let b = bss("/bss/b", b"Home", Mode::Infra, Security::Psk);
        let c = bss("/bss/c", b"Home", Mode::Infra, Security::Ieee8021x);

        let ev_a = idx.insert("/iface/0", a);
        let ev_b = idx.insert("/iface/0", b);
        let ev_c = idx.insert("/iface/0", c);

        assert!(matches!(ev_a, Some(NetworkEvent::Added(_))));
        assert_eq!(ev_b, None, "second BSS with identical triple must not re-announce the network");
        assert!(matches!(ev_c, Some(NetworkEvent::Added(_))));
        assert_eq!(idx.networks().count(), 2);

        let home_psk = idx.network_for_bss("/bss/a").unwrap();
        assert_eq!(home_psk.bss_table.len(), 2);
    }

    #[test]
    fn removing_last_bss_emits_network_removed() {
        let mut idx = NetworkIndex::new();
        let a = bss("/bss/a", b"Home", Mode::Infra, Security::Psk);
        let b = bss("/bss/b", b"Home", Mode::Infra, Security::Psk);
        idx.insert("/iface/0", a);
        idx.insert("/iface/0", b);

        assert_eq!(idx.remove("/bss/a"), None, "network still has one more BSS");
        let removed = idx.remove("/bss/b");
        assert!(matches!(removed, Some(NetworkEvent::Removed(_))));
        assert_eq!(idx.networks().count(), 0);
    }

    #[test]
    fn removing_unknown_path_is_a_no_op() {
        let mut idx = NetworkIndex::new();
        assert_eq!(idx.remove("/bss/never-seen"), None);
    }

    #[test]
    fn name_and_mode_fixed_at_creation() {
        let mut idx = NetworkIndex::new();
        let a = bss("/bss/a", b"Home", Mode::Infra, Security::Psk);
        idx.insert("/iface/0", a);
        let group = group_key(&bss("/bss/a", b"Home", Mode::Infra, Security::Psk));
        let name_before = idx.network(&group).unwrap().name.clone();

        // A second BSS with an identical triple (by construction of the key,
        // this can only carry the same ssid/mode/security) must not alter
        // the recorded name.
        let b = bss("/bss/b", b"Home", Mode::Infra, Security::Psk);
        idx.insert("/iface/0", b);
        assert_eq!(idx.network(&group).unwrap().name, name_before);
    }

    #[test]
    fn bss_added_twice_is_idempotent() {
        let mut idx = NetworkIndex::new();
        let a1 = bss("/bss/a", b"Home", Mode::Infra, Security::Psk);
        let a2 = bss("/bss/a", b"Home", Mode::Infra, Security::Psk);
        idx.insert("/iface/0", a1);
        let second = idx.insert("/iface/0", a2);
        assert_eq!(second, None);
        assert_eq!(idx.networks().count(), 1);
        assert_eq!(idx.network_for_bss("/bss/a").unwrap().bss_table.len(), 1);
    }
}
