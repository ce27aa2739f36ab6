// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parses RSN and WPA information elements into the two security flags the
//! rest of the crate cares about: `ieee8021x` and `psk`.
//!
//! Callers pass the *body* of the element, with the element-id/length (and,
//! for WPAIE, the OUI + OUI-type) header already stripped — see
//! [`RSNIE_BODY_OFFSET`] and [`WPAIE_BODY_OFFSET`] in `bss.rs`. Malformed
//! input never errors: it just returns with both flags unset, matching
//! `malformed-IE` in the error taxonomy (spec.md §7), which is swallowed by
//! design rather than propagated.

const WPA_OUI: [u8; 3] = [0x00, 0x50, 0xf2];
const IEEE80211_OUI: [u8; 3] = [0x00, 0x0f, 0xac];

/// Flags accumulated while walking the AKM suite list of an RSN-like element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IeFlags {
    pub ieee8021x: bool,
    pub psk: bool,
}

/// Decodes the AKM suite list out of an RSNIE or WPAIE body.
///
/// Layout (§4.1): 2-byte version, 4-byte group cipher, 2-byte pairwise
/// count + N*4 pairwise suites, 2-byte AKM count + M*4 AKM suites. Every
/// length is checked before it's consumed; a buffer that runs out at any
/// point returns whatever flags were already set (none, for a truncation
/// before the AKM list).
pub fn parse_rsn_like(bytes: &[u8]) -> IeFlags {
    let mut flags = IeFlags::default();

    let mut pos = 0usize;
    macro_rules! need {
        ($n:expr) => {
            if bytes.len() < pos + $n {
                return flags;
            }
        };
    }

    // Version.
    need!(2);
    pos += 2;

    // Group cipher suite.
    need!(4);
    pos += 4;

    // Pairwise cipher suite list.
    need!(2);
    let pairwise_count = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
    pos += 2;
    need!(pairwise_count * 4);
    pos += pairwise_count * 4;

    // AKM suite list.
    need!(2);
    let akm_count = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
    pos += 2;
    need!(akm_count * 4);

    for i in 0..akm_count {
        let suite = &bytes[pos + i * 4..pos + i * 4 + 4];
        let oui = [suite[0], suite[1], suite[2]];
        if oui != WPA_OUI && oui != IEEE80211_OUI {
            continue;
        }
        match suite[3] {
            1 => flags.ieee8021x = true,
            2 => flags.psk = true,
            _ => {}
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn akm_suite(oui: [u8; 3], subtype: u8) -> [u8; 4] {
        [oui[0], oui[1], oui[2], subtype]
    }

    fn rsn_body(pairwise: &[[u8; 4]], akms: &[[u8; 4]]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&[1, 0]); // version
        v.extend_from_slice(&IEEE80211_OUI);
        v.push(4); // group cipher CCMP
        v.extend_from_slice(&(pairwise.len() as u16).to_le_bytes());
        for p in pairwise {
            v.extend_from_slice(p);
        }
        v.extend_from_slice(&(akms.len() as u16).to_le_bytes());
        for a in akms {
            v.extend_from_slice(a);
        }
        v
    }

    #[test]
    fn psk_akm_sets_psk_flag() {
        let body = rsn_body(
            &[akm_suite(IEEE80211_OUI, 4)],
            &[akm_suite(IEEE80211_OUI, 2)],
        );
        let flags = parse_rsn_like(&body);
        assert_eq!(flags, IeFlags { ieee8021x: false, psk: true });
    }

    #[test]
    fn ieee8021x_akm_sets_8021x_flag() {
        let body = rsn_body(
            &[akm_suite(IEEE80211_OUI, 4)],
            &[akm_suite(IEEE80211_OUI, 1)],
        );
        let flags = parse_rsn_like(&body);
        assert_eq!(flags, IeFlags { ieee8021x: true, psk: false });
    }

    #[test]
    fn wpa_oui_akm_also_recognized() {
        let body = rsn_body(&[akm_suite(WPA_OUI, 4)], &[akm_suite(WPA_OUI, 2)]);
        assert!(parse_rsn_like(&body).psk);
    }

    #[test]
    fn unknown_oui_ignored() {
        let body = rsn_body(&[akm_suite(IEEE80211_OUI, 4)], &[[0xde, 0xad, 0xbe, 2]]);
        assert_eq!(parse_rsn_like(&body), IeFlags::default());
    }

    #[test]
    fn unknown_subtype_ignored() {
        let body = rsn_body(&[akm_suite(IEEE80211_OUI, 4)], &[akm_suite(IEEE80211_OUI, 9)]);
        assert_eq!(parse_rsn_like(&body), IeFlags::default());
    }

    #[test]
    fn truncated_before_akm_list_sets_no_flags() {
        // Only version + group cipher + pairwise count, no AKM section at all.
        let mut body = vec![1, 0];
        body.extend_from_slice(&IEEE80211_OUI);
        body.push(4);
        body.extend_from_slice(&0u16.to_le_bytes());
        assert_eq!(parse_rsn_like(&body), IeFlags::default());
    }

    #[test]
    fn empty_buffer_is_safe() {
        assert_eq!(parse_rsn_like(&[]), IeFlags::default());
    }

    #[test]
    fn multiple_akms_upgrade_to_highest() {
        let body = rsn_body(
            &[akm_suite(IEEE80211_OUI, 4)],
            &[akm_suite(IEEE80211_OUI, 2), akm_suite(IEEE80211_OUI, 1)],
        );
        let flags = parse_rsn_like(&body);
        assert!(flags.psk && flags.ieee8021x);
    }
}
