// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Builds a [`Bss`] record out of an unordered, sentinel-terminated sequence
//! of `(key, value)` pairs — the shape a `GetAll`/`PropertiesChanged`
//! D-Bus property bag takes once decoded (spec.md §4.2).

use tracing::debug;

use crate::types::{Mode, Security};

/// RSNIE bodies start 2 bytes into the element (element-id + length).
pub const RSNIE_BODY_OFFSET: usize = 2;
/// WPAIE bodies start 6 bytes in (element-id + length + 4-byte OUI+type).
pub const WPAIE_BODY_OFFSET: usize = 6;

const CAP_ESS: u16 = 0x0001;
const CAP_IBSS: u16 = 0x0002;
const CAP_PRIVACY: u16 = 0x0010;

/// One typed value out of a decoded D-Bus property bag. This is the crate's
/// transport-agnostic stand-in for `zbus::zvariant::Value`, so the builder
/// (and its tests) don't need a live bus connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bytes(Vec<u8>),
    U16(u16),
    Bool(bool),
    Str(String),
}

/// A single observed access point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bss {
    pub path: String,
    pub bssid: [u8; 6],
    pub ssid: [u8; 32],
    pub ssid_len: usize,
    pub frequency: u16,
    pub mode: Mode,
    pub security: Security,
    pub privacy: bool,
    pub psk: bool,
    pub ieee8021x: bool,
}

impl Bss {
    /// SSID bytes actually in use, i.e. `ssid[..ssid_len]`.
    pub fn ssid_bytes(&self) -> &[u8] {
        &self.ssid[..self.ssid_len]
    }
}

/// Accumulates property-bag keys for one BSS, robust to any subset of keys
/// being present and to any order (§4.2).
#[derive(Debug, Default)]
pub struct BssBuilder {
    bssid: [u8; 6],
    ssid: [u8; 32],
    ssid_len: usize,
    frequency: u16,
    mode: Mode,
    mode_from_capabilities: Mode,
    privacy: bool,
    ieee8021x: bool,
    psk: bool,
}

impl BssBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one `(key, value)` pair from the bag. Call [`Self::finish`]
    /// once the sentinel (end-of-bag marker) is reached.
    pub fn apply(&mut self, key: &str, value: &PropValue) {
        match (key, value) {
            ("BSSID", PropValue::Bytes(b)) if b.len() == 6 => {
                self.bssid.copy_from_slice(b);
            }
            ("SSID", PropValue::Bytes(b)) if (1..=32).contains(&b.len()) => {
                self.ssid = [0u8; 32];
                self.ssid[..b.len()].copy_from_slice(b);
                self.ssid_len = b.len();
            }
            ("SSID", PropValue::Bytes(_)) => {
                // Zero-length, or >32 bytes: treated as empty/hidden.
                self.ssid = [0u8; 32];
                self.ssid_len = 0;
            }
            ("Capabilities", PropValue::U16(bits)) => {
                if bits & CAP_ESS != 0 {
                    self.mode_from_capabilities = Mode::Infra;
                } else if bits & CAP_IBSS != 0 {
                    self.mode_from_capabilities = Mode::AdHoc;
                }
                if bits & CAP_PRIVACY != 0 {
                    self.privacy = true;
                }
            }
            ("Mode", PropValue::Str(s)) => {
                self.mode = Mode::from_wire(s);
            }
            ("Frequency", PropValue::U16(f)) => {
                self.frequency = *f;
            }
            ("Privacy", PropValue::Bool(b)) => {
                self.privacy = *b;
            }
            ("RSNIE", PropValue::Bytes(b)) | ("WPAIE", PropValue::Bytes(b)) => {
                let offset = if key == "RSNIE" { RSNIE_BODY_OFFSET } else { WPAIE_BODY_OFFSET };
                if b.len() >= offset {
                    let flags = crate::ie::parse_rsn_like(&b[offset..]);
                    self.ieee8021x |= flags.ieee8021x;
                    self.psk |= flags.psk;
                }
                // Shorter-than-header buffers are silently dropped (malformed-IE).
            }
            ("WPSIE", _) => {
                // Recognized, no security flags derived.
            }
            ("Signal", _) | ("Level", _) | ("MaxRate", _) => {
                // Read but not retained.
            }
            (other, _) => {
                debug!(key = other, "bss property: unrecognized key");
            }
        }
    }

    /// §4.2 sentinel handling: pick the final mode (explicit `Mode` string
    /// wins over the capability-derived guess, matching the original's
    /// "Mode (string) overrides mode from capabilities" precedence), derive
    /// security, and produce the finished record.
    pub fn finish(self, path: String) -> Bss {
        let mode = match self.mode {
            Mode::Unknown => self.mode_from_capabilities,
            explicit => explicit,
        };
        let security = Security::classify(self.ieee8021x, self.psk, self.privacy);
        Bss {
            path,
            bssid: self.bssid,
            ssid: self.ssid,
            ssid_len: self.ssid_len,
            frequency: self.frequency,
            mode,
            security,
            privacy: self.privacy,
            psk: self.psk,
            ieee8021x: self.ieee8021x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsnie_with_akm(subtype: u8) -> Vec<u8> {
        // header(2) + version(2) + group(4) + pairwise-count(2) + pairwise(4)
        // + akm-count(2) + akm(4)
        let mut v = vec![0x30, 18]; // element id + length (arbitrary, header only)
        v.extend_from_slice(&[1, 0]); // version
        v.extend_from_slice(&[0x00, 0x0f, 0xac, 4]); // group cipher ccmp
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&[0x00, 0x0f, 0xac, 4]); // pairwise ccmp
        v.extend_from_slice(&1u16.to_le_bytes());
        v.extend_from_slice(&[0x00, 0x0f, 0xac, subtype]);
        v
    }

    #[test]
    fn bootstrap_wpa_psk_ap() {
        let mut b = BssBuilder::new();
        b.apply("SSID", &PropValue::Bytes(b"Guest".to_vec()));
        b.apply("Capabilities", &PropValue::U16(0x0011));
        b.apply("Frequency", &PropValue::U16(2412));
        b.apply("RSNIE", &PropValue::Bytes(rsnie_with_akm(2)));
        let bss = b.finish("/bss/0".into());

        assert_eq!(bss.mode, Mode::Infra);
        assert_eq!(bss.security, Security::Psk);
        assert!(bss.privacy);
        assert!(bss.psk);
        assert!(!bss.ieee8021x);
        assert_eq!(bss.ssid_bytes(), b"Guest");
        assert_eq!(bss.bssid, [0u8; 6]);
    }

    #[test]
    fn hidden_ap_has_no_name_relevant_ssid() {
        let mut b = BssBuilder::new();
        b.apply("Capabilities", &PropValue::U16(0x0001));
        let bss = b.finish("/bss/1".into());
        assert_eq!(bss.ssid_len, 0);
        assert_eq!(bss.mode, Mode::Infra);
        assert_eq!(bss.security, Security::None);
    }

    #[test]
    fn privacy_then_wpaie_upgrades_wep_to_psk() {
        let mut b = BssBuilder::new();
        b.apply("Privacy", &PropValue::Bool(true));

        let mut wpaie = vec![0xdd, 0x16, 0x00, 0x50, 0xf2, 0x01]; // header + OUI + type
        wpaie.extend_from_slice(&[1, 0]); // version
        wpaie.extend_from_slice(&[0x00, 0x50, 0xf2, 2]); // group cipher (multicast)
        wpaie.extend_from_slice(&1u16.to_le_bytes());
        wpaie.extend_from_slice(&[0x00, 0x50, 0xf2, 2]); // pairwise tkip
        wpaie.extend_from_slice(&1u16.to_le_bytes());
        wpaie.extend_from_slice(&[0x00, 0x50, 0xf2, 2]); // akm PSK
        b.apply("WPAIE", &PropValue::Bytes(wpaie));

        let bss = b.finish("/bss/2".into());
        assert_eq!(bss.security, Security::Psk);
    }

    #[test]
    fn explicit_mode_string_overrides_capability_guess() {
        let mut b = BssBuilder::new();
        b.apply("Capabilities", &PropValue::U16(0x0001)); // ESS -> infra
        b.apply("Mode", &PropValue::Str("ad-hoc".into()));
        let bss = b.finish("/bss/3".into());
        assert_eq!(bss.mode, Mode::AdHoc);
    }

    #[test]
    fn ssid_length_33_is_rejected_as_empty() {
        let mut b = BssBuilder::new();
        b.apply("SSID", &PropValue::Bytes(vec![b'x'; 33]));
        let bss = b.finish("/bss/4".into());
        assert_eq!(bss.ssid_len, 0);
    }

    #[test]
    fn ssid_length_32_is_accepted() {
        let mut b = BssBuilder::new();
        b.apply("SSID", &PropValue::Bytes(vec![b'x'; 32]));
        let bss = b.finish("/bss/5".into());
        assert_eq!(bss.ssid_len, 32);
    }

    #[test]
    fn rsnie_shorter_than_header_sets_no_flags() {
        let mut b = BssBuilder::new();
        b.apply("RSNIE", &PropValue::Bytes(vec![0x30]));
        let bss = b.finish("/bss/6".into());
        assert!(!bss.psk && !bss.ieee8021x);
    }

    #[test]
    fn unknown_key_does_not_panic() {
        let mut b = BssBuilder::new();
        b.apply("SomeVendorBlob", &PropValue::Bytes(vec![1, 2, 3]));
        let _ = b.finish("/bss/7".into());
    }
}
