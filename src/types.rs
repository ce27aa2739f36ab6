// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Closed enumerations and capability bitsets shared by the rest of the crate.
//!
//! Every string table here is total: an unrecognized wire string maps to the
//! `Unknown`/default variant rather than producing an error, mirroring the
//! `string2mode`/`mode2string`-style pairs of the C implementation this
//! crate replaces.

use bitflags::bitflags;

/// BSS/network operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Unknown,
    Infra,
    AdHoc,
}

impl Mode {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "infrastructure" => Mode::Infra,
            "ad-hoc" => Mode::AdHoc,
            _ => Mode::Unknown,
        }
    }

    /// Short form used in network group keys (`_infra`, `_adhoc`); `None` for
    /// `Unknown`, in which case no suffix is appended at all.
    pub fn group_suffix(&self) -> Option<&'static str> {
        match self {
            Mode::Infra => Some("infra"),
            Mode::AdHoc => Some("adhoc"),
            Mode::Unknown => None,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Unknown
    }
}

/// Derived BSS/network security classification: 8021X > PSK > WEP > none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Security {
    Unknown,
    None,
    Wep,
    Psk,
    Ieee8021x,
}

impl Security {
    pub fn group_suffix(&self) -> Option<&'static str> {
        match self {
            Security::None => Some("none"),
            Security::Wep => Some("wep"),
            Security::Psk => Some("psk"),
            Security::Ieee8021x => Some("ieee8021x"),
            Security::Unknown => None,
        }
    }

    /// §4.2: `8021X if ieee8021x else PSK if psk else WEP if privacy else none`.
    pub fn classify(ieee8021x: bool, psk: bool, privacy: bool) -> Self {
        if ieee8021x {
            Security::Ieee8021x
        } else if psk {
            Security::Psk
        } else if privacy {
            Security::Wep
        } else {
            Security::None
        }
    }
}

impl Default for Security {
    fn default() -> Self {
        Security::Unknown
    }
}

/// Supplicant interface association state (spec.md §4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Unknown,
    Disconnected,
    Inactive,
    Scanning,
    Authenticating,
    Associating,
    Associated,
    GroupHandshake,
    FourWayHandshake,
    Completed,
}

impl State {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "disconnected" => State::Disconnected,
            "inactive" => State::Inactive,
            "scanning" => State::Scanning,
            "authenticating" => State::Authenticating,
            "associating" => State::Associating,
            "associated" => State::Associated,
            "group_handshake" => State::GroupHandshake,
            "4way_handshake" => State::FourWayHandshake,
            "completed" => State::Completed,
            _ => State::Unknown,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::Unknown
    }
}

bitflags! {
    /// `Capabilities.KeyMgmt` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyMgmt: u32 {
        const NONE     = 1 << 0;
        const IEEE8021X = 1 << 1;
        const WPA_NONE = 1 << 2;
        const WPA_PSK  = 1 << 3;
        const WPA_EAP  = 1 << 4;
        const WPS      = 1 << 5;
    }

    /// `Capabilities.AuthAlg` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AuthAlg: u32 {
        const OPEN   = 1 << 0;
        const SHARED = 1 << 1;
        const LEAP   = 1 << 2;
    }

    /// `Capabilities.Protocol` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protocol: u32 {
        const WPA = 1 << 0;
        const RSN = 1 << 1;
    }

    /// `Capabilities.Group` cipher entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GroupCipher: u32 {
        const WEP40  = 1 << 0;
        const WEP104 = 1 << 1;
        const TKIP   = 1 << 2;
        const CCMP   = 1 << 3;
    }

    /// `Capabilities.Pairwise` cipher entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PairwiseCipher: u32 {
        const NONE = 1 << 0;
        const TKIP = 1 << 1;
        const CCMP = 1 << 2;
    }

    /// `Capabilities.Scan` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScanCapa: u32 {
        const ACTIVE  = 1 << 0;
        const PASSIVE = 1 << 1;
        const SSID    = 1 << 2;
    }

    /// `Capabilities.Modes` entries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModeCapa: u32 {
        const INFRA = 1 << 0;
        const IBSS  = 1 << 1;
        const AP    = 1 << 2;
    }

    /// Process-wide EAP methods advertised by the peer (`EapMethods`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EapMethods: u32 {
        const MD5      = 1 << 0;
        const TLS      = 1 << 1;
        const MSCHAPV2 = 1 << 2;
        const PEAP     = 1 << 3;
        const TTLS     = 1 << 4;
        const GTC      = 1 << 5;
        const OTP      = 1 << 6;
        const LEAP     = 1 << 7;
        const WSC      = 1 << 8;
    }
}

impl KeyMgmt {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "none" => KeyMgmt::NONE,
            "ieee8021x" => KeyMgmt::IEEE8021X,
            "wpa-none" => KeyMgmt::WPA_NONE,
            "wpa-psk" => KeyMgmt::WPA_PSK,
            "wpa-eap" => KeyMgmt::WPA_EAP,
            "wps" => KeyMgmt::WPS,
            _ => return None,
        })
    }
}

impl AuthAlg {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "open" => AuthAlg::OPEN,
            "shared" => AuthAlg::SHARED,
            "leap" => AuthAlg::LEAP,
            _ => return None,
        })
    }
}

impl Protocol {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "wpa" => Protocol::WPA,
            "rsn" => Protocol::RSN,
            _ => return None,
        })
    }
}

impl GroupCipher {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "wep40" => GroupCipher::WEP40,
            "wep104" => GroupCipher::WEP104,
            "tkip" => GroupCipher::TKIP,
            "ccmp" => GroupCipher::CCMP,
            _ => return None,
        })
    }
}

impl PairwiseCipher {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "none" => PairwiseCipher::NONE,
            "tkip" => PairwiseCipher::TKIP,
            "ccmp" => PairwiseCipher::CCMP,
            _ => return None,
        })
    }
}

impl ScanCapa {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "active" => ScanCapa::ACTIVE,
            "passive" => ScanCapa::PASSIVE,
            "ssid" => ScanCapa::SSID,
            _ => return None,
        })
    }
}

impl ModeCapa {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "infrastructure" => ModeCapa::INFRA,
            "ad-hoc" => ModeCapa::IBSS,
            "ap" => ModeCapa::AP,
            _ => return None,
        })
    }
}

impl EapMethods {
    pub fn from_wire(s: &str) -> Option<Self> {
        Some(match s {
            "MD5" => EapMethods::MD5,
            "TLS" => EapMethods::TLS,
            "MSCHAPV2" => EapMethods::MSCHAPV2,
            "PEAP" => EapMethods::PEAP,
            "TTLS" => EapMethods::TTLS,
            "GTC" => EapMethods::GTC,
            "OTP" => EapMethods::OTP,
            "LEAP" => EapMethods::LEAP,
            "WSC" => EapMethods::WSC,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trip() {
        assert_eq!(Mode::from_wire("infrastructure"), Mode::Infra);
        assert_eq!(Mode::from_wire("ad-hoc"), Mode::AdHoc);
        assert_eq!(Mode::from_wire("garbage"), Mode::Unknown);
        assert_eq!(Mode::Infra.group_suffix(), Some("infra"));
        assert_eq!(Mode::Unknown.group_suffix(), None);
    }

    #[test]
    fn security_classification_is_monotone() {
        assert_eq!(Security::classify(false, false, false), Security::None);
        assert_eq!(Security::classify(false, false, true), Security::Wep);
        assert_eq!(Security::classify(false, true, true), Security::Psk);
        assert_eq!(Security::classify(true, true, true), Security::Ieee8021x);
    }

    #[test]
    fn state_unknown_fallback() {
        assert_eq!(State::from_wire("completed"), State::Completed);
        assert_eq!(State::from_wire("banana"), State::Unknown);
    }

    #[test]
    fn capability_strings_are_ignored_when_unknown() {
        assert_eq!(KeyMgmt::from_wire("wpa-psk"), Some(KeyMgmt::WPA_PSK));
        assert_eq!(KeyMgmt::from_wire("nonsense"), None);
    }
}
