// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The concrete realization of spec.md's "opaque RPC transport that
//! delivers typed property bags and signals": typed `zbus` proxies for the
//! peer's well-known D-Bus API, plus the conversions between `zvariant`
//! values and the crate's transport-agnostic [`crate::bss::PropValue`] /
//! [`crate::interface::IfaceValue`].
//!
//! See <https://w1.fi/wpa_supplicant/devel/dbus.html> for the wire API this
//! mirrors.

use std::collections::HashMap;

use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::bss::PropValue;
use crate::interface::IfaceValue;

pub const SERVICE_NAME: &str = "fi.w1.wpa_supplicant1";
pub const ROOT_PATH: &str = "/fi/w1/wpa_supplicant1";
pub const ROOT_INTERFACE: &str = "fi.w1.wpa_supplicant1";
pub const IFACE_INTERFACE: &str = "fi.w1.wpa_supplicant1.Interface";
pub const BSS_INTERFACE: &str = "fi.w1.wpa_supplicant1.BSS";

/// The peer's root object (spec.md §6: `CreateInterface`/`GetInterface`,
/// `Interfaces`/`EapMethods` properties, `DebugParams`).
#[zbus::proxy(
    interface = "fi.w1.wpa_supplicant1",
    default_service = "fi.w1.wpa_supplicant1",
    default_path = "/fi/w1/wpa_supplicant1"
)]
pub trait Root {
    fn get_interface(&self, ifname: &str) -> zbus::Result<OwnedObjectPath>;
    fn create_interface(
        &self,
        args: HashMap<&str, Value<'_>>,
    ) -> zbus::Result<OwnedObjectPath>;

    #[zbus(property)]
    fn interfaces(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
    #[zbus(property)]
    fn eap_methods(&self) -> zbus::Result<Vec<String>>;

    #[zbus(property, name = "DebugParams")]
    fn debug_params(&self) -> zbus::Result<(i32, bool, bool)>;
    #[zbus(property, name = "DebugParams")]
    fn set_debug_params(&self, value: (i32, bool, bool)) -> zbus::Result<()>;

    #[zbus(signal)]
    fn interface_added(
        &self,
        path: OwnedObjectPath,
        properties: HashMap<String, OwnedValue>,
    ) -> zbus::Result<()>;
    #[zbus(signal, name = "InterfaceCreated")]
    fn interface_created(
        &self,
        path: OwnedObjectPath,
        properties: HashMap<String, OwnedValue>,
    ) -> zbus::Result<()>;
    #[zbus(signal)]
    fn interface_removed(&self, path: OwnedObjectPath) -> zbus::Result<()>;
    #[zbus(signal)]
    fn properties_changed(&self, properties: HashMap<String, OwnedValue>) -> zbus::Result<()>;
}

/// Per-interface `.Interface` facet (spec.md §4.4/§4.5).
#[zbus::proxy(
    interface = "fi.w1.wpa_supplicant1.Interface",
    default_service = "fi.w1.wpa_supplicant1"
)]
pub trait SupplicantInterface {
    fn scan(&self, args: HashMap<&str, Value<'_>>) -> zbus::Result<()>;
    fn disconnect(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn state(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn scanning(&self) -> zbus::Result<bool>;
    #[zbus(property, name = "ApScan")]
    fn ap_scan(&self) -> zbus::Result<i32>;
    #[zbus(property)]
    fn ifname(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn driver(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn bridge_ifname(&self) -> zbus::Result<String>;
    #[zbus(property, name = "CurrentBSS")]
    fn current_bss(&self) -> zbus::Result<OwnedObjectPath>;
    #[zbus(property)]
    fn current_network(&self) -> zbus::Result<OwnedObjectPath>;
    #[zbus(property, name = "BSSs")]
    fn bsss(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
    #[zbus(property)]
    fn networks(&self) -> zbus::Result<Vec<OwnedObjectPath>>;
    #[zbus(property)]
    fn capabilities(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    #[zbus(signal)]
    fn scan_done(&self, success: bool) -> zbus::Result<()>;
    #[zbus(signal, name = "BSSAdded")]
    fn bss_added(
        &self,
        path: OwnedObjectPath,
        properties: HashMap<String, OwnedValue>,
    ) -> zbus::Result<()>;
    #[zbus(signal, name = "BSSRemoved")]
    fn bss_removed(&self, path: OwnedObjectPath) -> zbus::Result<()>;
    #[zbus(signal)]
    fn network_added(
        &self,
        path: OwnedObjectPath,
        properties: HashMap<String, OwnedValue>,
    ) -> zbus::Result<()>;
    #[zbus(signal)]
    fn network_removed(&self, path: OwnedObjectPath) -> zbus::Result<()>;
}

/// `org.freedesktop.DBus` — only `NameOwnerChanged` for the peer's
/// well-known name, and the bootstrap-time "is the peer already up" check,
/// are consumed (spec.md §4.5/§6).
#[zbus::proxy(
    interface = "org.freedesktop.DBus",
    default_service = "org.freedesktop.DBus",
    default_path = "/org/freedesktop/DBus"
)]
pub trait BusDaemon {
    fn name_has_owner(&self, name: &str) -> zbus::Result<bool>;

    #[zbus(signal)]
    fn name_owner_changed(&self, name: String, old_owner: String, new_owner: String)
        -> zbus::Result<()>;
}

/// A hand-written `org.freedesktop.DBus.Properties` proxy, kept separate
/// from `zbus::fdo`'s built-in one so every RPC in this crate surfaces the
/// same `zbus::Result`/`zbus::Error` this module's other proxies use,
/// rather than `zbus::fdo`'s own error type. Same shape as the `Properties`
/// proxy in the pack's other wpa_supplicant D-Bus client.
#[zbus::proxy(
    interface = "org.freedesktop.DBus.Properties",
    default_service = "fi.w1.wpa_supplicant1"
)]
pub trait Properties {
    fn get_all(&self, interface_name: &str) -> zbus::Result<HashMap<String, OwnedValue>>;
}

/// Converts one decoded `zvariant::OwnedValue` into the BSS builder's
/// transport-agnostic [`PropValue`]. Keys whose wire shape doesn't match
/// any recognized form are dropped here rather than in `BssBuilder`, so the
/// builder's `apply` stays a pure function of already-typed values.
pub fn bss_prop_value(key: &str, value: &OwnedValue) -> Option<PropValue> {
    match key {
        "BSSID" | "SSID" | "RSNIE" | "WPAIE" => {
            Vec::<u8>::try_from(value).ok().map(PropValue::Bytes)
        }
        "Capabilities" | "Frequency" => u16::try_from(value).ok().map(PropValue::U16),
        "Privacy" => bool::try_from(value).ok().map(PropValue::Bool),
        "Mode" => <&str>::try_from(value).ok().map(|s| PropValue::Str(s.to_string())),
        _ => None,
    }
}

/// Converts one decoded `zvariant::OwnedValue` into [`IfaceValue`] for the
/// top-level interface property bag. `Capabilities` is nested: each of its
/// entries is itself an array of strings, keyed by capability class.
pub fn iface_prop_value(key: &str, value: &OwnedValue) -> Option<IfaceValue> {
    match key {
        "State" | "Ifname" | "Driver" | "BridgeIfname" => {
            <&str>::try_from(value).ok().map(|s| IfaceValue::Str(s.to_string()))
        }
        "CurrentBSS" | "CurrentNetwork" => {
            OwnedObjectPath::try_from(value.clone()).ok().map(|p| IfaceValue::Str(p.to_string()))
        }
        "Scanning" => bool::try_from(value).ok().map(IfaceValue::Bool),
        "ApScan" => i32::try_from(value).ok().map(IfaceValue::Int),
        "BSSs" | "Networks" => Vec::<OwnedObjectPath>::try_from(value)
            .ok()
            .map(|paths| IfaceValue::Paths(paths.into_iter().map(|p| p.to_string()).collect())),
        "Capabilities" => {
            let nested = HashMap::<String, OwnedValue>::try_from(value).ok()?;
            let mut classes = Vec::with_capacity(nested.len());
            for (class, v) in nested {
                if let Ok(strings) = Vec::<String>::try_from(&v) {
                    classes.push((class, strings));
                }
            }
            Some(IfaceValue::Capabilities(classes))
        }
        "Blobs" => None,
        _ => None,
    }
}
