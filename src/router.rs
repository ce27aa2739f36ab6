// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Demultiplexes the peer's D-Bus signals into calls against a single,
//! task-owned [`Replica`], generalizing the teacher's
//! `station::serve_mlme_sme` `select!`-over-streams dispatch loop from an
//! MLME event stream to this peer's signal table (spec.md §4.5).
//!
//! One task per interface forwards that interface's signals into a shared
//! event channel, spawned on `InterfaceAdded`/`InterfaceCreated` and
//! aborted on `InterfaceRemoved` — mirroring how the teacher spawns one SME
//! task per managed interface rather than multiplexing them by hand.

use std::collections::HashMap;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::Connection;

use crate::error::Error;
use crate::interface::{Interface, InterfaceEvent};
use crate::replica::Replica;
use crate::transport::{
    self, BusDaemonProxy, PropertiesProxy, RootProxy, SupplicantInterfaceProxy, BSS_INTERFACE,
    IFACE_INTERFACE, ROOT_INTERFACE, ROOT_PATH, SERVICE_NAME,
};

/// A decoded signal, tagged with whatever path context the replica needs to
/// route it. Internal to this module; `replica.rs` never sees a `zbus` type.
enum RouterEvent {
    PeerLost,
    PeerReturned,
    InterfaceAdded(OwnedObjectPath),
    InterfaceRemoved(OwnedObjectPath),
    RootPropertiesChanged(HashMap<String, OwnedValue>),
    IfacePropertiesChanged(String, HashMap<String, OwnedValue>),
    ScanDone(String),
    BssAdded(String, OwnedObjectPath),
    BssRemoved(String, String),
    NetworkAdded(String, String),
    NetworkRemoved(String, String),
}

/// A control operation submitted from outside the router task (spec.md
/// §4.7). Each carries a `oneshot::Sender` for its completion, replacing
/// the C implementation's completion-callback-plus-userdata pair.
pub enum ControlCommand {
    InterfaceCreate {
        ifname: String,
        driver: String,
        reply: oneshot::Sender<Result<Interface, Error>>,
    },
    InterfaceScan { iface_path: String, reply: oneshot::Sender<Result<(), Error>> },
    InterfaceDisconnect { iface_path: String, reply: oneshot::Sender<Result<(), Error>> },
    SetDebugLevel {
        level: String,
        timestamp: bool,
        show_keys: bool,
        reply: oneshot::Sender<Result<(), Error>>,
    },
    /// `supplicant_unregister`: tears the replica down (emitting
    /// `system_killed` if the peer was available) and ends the router
    /// task. Handled directly in [`run`], not [`handle_command`], since it
    /// must succeed even while the peer is unavailable.
    Unregister { reply: oneshot::Sender<()> },
}

/// Runs until `commands` is dropped or the connection itself fails. Owns
/// the one and only [`Replica`] for this connection; per spec.md §5 it is
/// never shared behind a lock because nothing outside this task ever
/// touches it directly.
pub async fn run(
    connection: Connection,
    mut replica: Replica,
    mut commands: mpsc::Receiver<ControlCommand>,
) -> Result<(), Error> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<RouterEvent>();

    spawn_bus_daemon_watcher(&connection, events_tx.clone());
    spawn_root_watcher(&connection, events_tx.clone());

    let mut iface_tasks: HashMap<String, AbortHandle> = HashMap::new();

    if peer_is_present(&connection).await? {
        bootstrap(&connection, &mut replica, &events_tx, &mut iface_tasks).await?;
    }

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(ControlCommand::Unregister { reply }) => {
                        replica.unregister();
                        let _ = reply.send(());
                        break;
                    }
                    Some(cmd) => {
                        handle_command(&connection, &mut replica, &events_tx, &mut iface_tasks, cmd)
                            .await;
                    }
                    None => break,
                }
            }
            event = events_rx.recv() => {
                match event {
                    Some(event) => {
                        handle_event(&connection, &mut replica, &events_tx, &mut iface_tasks, event)
                            .await?;
                    }
                    None => break,
                }
            }
        }
    }

    for (_, handle) in iface_tasks {
        handle.abort();
    }
    Ok(())
}

async fn peer_is_present(connection: &Connection) -> Result<bool, Error> {
    let bus = BusDaemonProxy::new(connection).await?;
    Ok(bus.name_has_owner(SERVICE_NAME).await?)
}

fn spawn_bus_daemon_watcher(connection: &Connection, events_tx: mpsc::UnboundedSender<RouterEvent>) {
    let connection = connection.clone();
    tokio::spawn(async move {
        let proxy = match BusDaemonProxy::new(&connection).await {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "failed to build bus daemon proxy");
                return;
            }
        };
        let Ok(mut stream) = proxy.receive_name_owner_changed().await else {
            error!("failed to subscribe to NameOwnerChanged");
            return;
        };
        while let Some(signal) = stream.next().await {
            let Ok(args) = signal.args() else { continue };
            if args.name() != SERVICE_NAME {
                continue;
            }
            let event = if args.new_owner().is_empty() {
                RouterEvent::PeerLost
            } else if args.old_owner().is_empty() {
                RouterEvent::PeerReturned
            } else {
                continue;
            };
            if events_tx.send(event).is_err() {
                return;
            }
        }
    });
}

fn spawn_root_watcher(connection: &Connection, events_tx: mpsc::UnboundedSender<RouterEvent>) {
    let connection = connection.clone();
    tokio::spawn(async move {
        let Ok(proxy) = RootProxy::new(&connection).await else {
            error!("failed to build root proxy");
            return;
        };

        let added = proxy.receive_interface_added().await;
        let created = proxy.receive_interface_created().await;
        let removed = proxy.receive_interface_removed().await;
        let props = proxy.receive_properties_changed().await;

        let mut added = match added {
            Ok(s) => s,
            Err(e) => return error!(error = %e, "failed to subscribe to InterfaceAdded"),
        };
        let mut created = match created {
            Ok(s) => s,
            Err(e) => return error!(error = %e, "failed to subscribe to InterfaceCreated"),
        };
        let mut removed = match removed {
            Ok(s) => s,
            Err(e) => return error!(error = %e, "failed to subscribe to InterfaceRemoved"),
        };
        let mut props = match props {
            Ok(s) => s,
            Err(e) => return error!(error = %e, "failed to subscribe to root PropertiesChanged"),
        };

        loop {
            tokio::select! {
                Some(signal) = added.next() => {
                    if let Ok(args) = signal.args() {
                        if events_tx.send(RouterEvent::InterfaceAdded(args.path().to_owned())).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = created.next() => {
                    if let Ok(args) = signal.args() {
                        if events_tx.send(RouterEvent::InterfaceAdded(args.path().to_owned())).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = removed.next() => {
                    if let Ok(args) = signal.args() {
                        if events_tx.send(RouterEvent::InterfaceRemoved(args.path().to_owned())).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = props.next() => {
                    if let Ok(args) = signal.args() {
                        if events_tx
                            .send(RouterEvent::RootPropertiesChanged(args.properties().clone()))
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                else => return,
            }
        }
    });
}

/// Spawned once per managed interface; forwards its BSS/network/scan/
/// property signals into the shared channel until aborted on removal.
fn spawn_interface_watcher(
    connection: &Connection,
    iface_path: String,
    events_tx: mpsc::UnboundedSender<RouterEvent>,
) -> AbortHandle {
    let connection = connection.clone();
    let handle = tokio::spawn(async move {
        let builder = match SupplicantInterfaceProxy::builder(&connection).path(iface_path.as_str()) {
            Ok(b) => b,
            Err(e) => return error!(iface_path, error = %e, "invalid interface path"),
        };
        let proxy = match builder.build().await {
            Ok(p) => p,
            Err(e) => return error!(iface_path, error = %e, "failed to build interface proxy"),
        };

        let (scan_done, bss_added, bss_removed, net_added, net_removed, props) = tokio::join!(
            proxy.receive_scan_done(),
            proxy.receive_bss_added(),
            proxy.receive_bss_removed(),
            proxy.receive_network_added(),
            proxy.receive_network_removed(),
            proxy.receive_properties_changed(),
        );
        let mut scan_done = match scan_done {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to ScanDone"),
        };
        let mut bss_added = match bss_added {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to BSSAdded"),
        };
        let mut bss_removed = match bss_removed {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to BSSRemoved"),
        };
        let mut net_added = match net_added {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to NetworkAdded"),
        };
        let mut net_removed = match net_removed {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to NetworkRemoved"),
        };
        let mut props = match props {
            Ok(s) => s,
            Err(e) => return error!(iface_path, error = %e, "failed to subscribe to interface PropertiesChanged"),
        };

        loop {
            tokio::select! {
                Some(signal) = scan_done.next() => {
                    if events_tx.send(RouterEvent::ScanDone(iface_path.clone())).is_err() {
                        return;
                    }
                    let _ = signal;
                }
                Some(signal) = bss_added.next() => {
                    if let Ok(args) = signal.args() {
                        if events_tx
                            .send(RouterEvent::BssAdded(iface_path.clone(), args.path().to_owned()))
                            .is_err()
                        {
                            return;
                        }
                    }
                }
                Some(signal) = bss_removed.next() => {
                    if let Ok(args) = signal.args() {
                        let event = RouterEvent::BssRemoved(iface_path.clone(), args.path().to_string());
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = net_added.next() => {
                    if let Ok(args) = signal.args() {
                        let event = RouterEvent::NetworkAdded(iface_path.clone(), args.path().to_string());
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = net_removed.next() => {
                    if let Ok(args) = signal.args() {
                        let event = RouterEvent::NetworkRemoved(iface_path.clone(), args.path().to_string());
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                Some(signal) = props.next() => {
                    if let Ok(args) = signal.args() {
                        let event = RouterEvent::IfacePropertiesChanged(
                            iface_path.clone(),
                            args.properties().clone(),
                        );
                        if events_tx.send(event).is_err() {
                            return;
                        }
                    }
                }
                else => return,
            }
        }
    });
    handle.abort_handle()
}

async fn handle_command(
    connection: &Connection,
    replica: &mut Replica,
    events_tx: &mpsc::UnboundedSender<RouterEvent>,
    iface_tasks: &mut HashMap<String, AbortHandle>,
    cmd: ControlCommand,
) {
    if !replica.is_available() {
        reject_unavailable(cmd);
        return;
    }
    match cmd {
        ControlCommand::InterfaceCreate { ifname, driver, reply } => {
            let result =
                create_interface(connection, replica, events_tx, iface_tasks, &ifname, &driver)
                    .await;
            let _ = reply.send(result);
        }
        ControlCommand::InterfaceScan { iface_path, reply } => {
            let result = scan(connection, &iface_path).await;
            let _ = reply.send(result);
        }
        ControlCommand::InterfaceDisconnect { iface_path, reply } => {
            let result = disconnect(connection, &iface_path).await;
            let _ = reply.send(result);
        }
        ControlCommand::SetDebugLevel { level, timestamp, show_keys, reply } => {
            let result = set_debug_level(connection, &level, timestamp, show_keys).await;
            let _ = reply.send(result);
        }
    }
}

fn reject_unavailable(cmd: ControlCommand) {
    match cmd {
        ControlCommand::InterfaceCreate { reply, .. } => {
            let _ = reply.send(Err(Error::PeerUnavailable));
        }
        ControlCommand::InterfaceScan { reply, .. } => {
            let _ = reply.send(Err(Error::PeerUnavailable));
        }
        ControlCommand::InterfaceDisconnect { reply, .. } => {
            let _ = reply.send(Err(Error::PeerUnavailable));
        }
        ControlCommand::SetDebugLevel { reply, .. } => {
            let _ = reply.send(Err(Error::PeerUnavailable));
        }
        ControlCommand::Unregister { reply } => {
            let _ = reply.send(());
        }
    }
}

async fn scan(connection: &Connection, iface_path: &str) -> Result<(), Error> {
    let proxy = SupplicantInterfaceProxy::builder(connection)
        .path(iface_path)?
        .build()
        .await?;
    let mut args: HashMap<&str, Value<'_>> = HashMap::new();
    args.insert("Type", Value::from("passive"));
    proxy.scan(args).await?;
    Ok(())
}

async fn disconnect(connection: &Connection, iface_path: &str) -> Result<(), Error> {
    let proxy = SupplicantInterfaceProxy::builder(connection)
        .path(iface_path)?
        .build()
        .await?;
    proxy.disconnect().await?;
    Ok(())
}

async fn set_debug_level(
    connection: &Connection,
    level: &str,
    timestamp: bool,
    show_keys: bool,
) -> Result<(), Error> {
    let root = RootProxy::new(connection).await?;
    let numeric_level = debug_level_to_wire(level);
    root.set_debug_params((numeric_level, timestamp, show_keys)).await?;
    Ok(())
}

fn debug_level_to_wire(level: &str) -> i32 {
    match level {
        "msgdump" => 0,
        "debug" => 1,
        "info" => 2,
        "warning" => 3,
        "error" => 4,
        _ => 2,
    }
}

/// `supplicant_interface_create`: `GetInterface` first, so a second request
/// for an interface the peer already manages resolves to the existing
/// record instead of erroring; only `GetInterface`'s failure falls back to
/// `CreateInterface({Ifname, Driver})`. Either way the resolved path is
/// adopted into the replica if it isn't there yet, then handed back as a
/// snapshot of the live `Interface`.
async fn create_interface(
    connection: &Connection,
    replica: &mut Replica,
    events_tx: &mpsc::UnboundedSender<RouterEvent>,
    iface_tasks: &mut HashMap<String, AbortHandle>,
    ifname: &str,
    driver: &str,
) -> Result<Interface, Error> {
    let root = RootProxy::new(connection).await?;

    let path = match root.get_interface(ifname).await {
        Ok(path) => path,
        Err(_) => {
            let mut args: HashMap<&str, Value<'_>> = HashMap::new();
            args.insert("Ifname", Value::from(ifname));
            args.insert("Driver", Value::from(driver));
            root.create_interface(args).await?
        }
    };

    // A reply carrying the null-object path means the peer didn't actually
    // resolve an interface (spec.md §4.5 path convention, §7 invalid-reply).
    if path.as_str() == crate::replica::NULL_PATH {
        return Err(Error::InvalidReply("path"));
    }

    let path_str = path.to_string();
    if replica.interface(&path_str).is_none() {
        adopt_interface(connection, replica, events_tx, iface_tasks, path).await?;
    }
    replica.interface(&path_str).cloned().ok_or(Error::NotFound(path_str))
}

async fn bootstrap(
    connection: &Connection,
    replica: &mut Replica,
    events_tx: &mpsc::UnboundedSender<RouterEvent>,
    iface_tasks: &mut HashMap<String, AbortHandle>,
) -> Result<(), Error> {
    replica.begin_bootstrap();

    let root_props = get_all(connection, ROOT_PATH, ROOT_INTERFACE).await?;
    if let Some(methods) = root_props.get("EapMethods") {
        if let Ok(names) = Vec::<String>::try_from(methods) {
            let mut flags = crate::types::EapMethods::empty();
            for name in &names {
                if let Some(bit) = crate::types::EapMethods::from_wire(name) {
                    flags |= bit;
                }
            }
            replica.set_eap_methods(flags);
        }
    }

    if let Some(paths) = root_props.get("Interfaces") {
        if let Ok(paths) = Vec::<OwnedObjectPath>::try_from(paths) {
            for path in paths {
                adopt_interface(connection, replica, events_tx, iface_tasks, path).await?;
            }
        }
    }

    replica.root_bootstrap_done();
    Ok(())
}

async fn adopt_interface(
    connection: &Connection,
    replica: &mut Replica,
    events_tx: &mpsc::UnboundedSender<RouterEvent>,
    iface_tasks: &mut HashMap<String, AbortHandle>,
    path: OwnedObjectPath,
) -> Result<(), Error> {
    let path_str = path.to_string();
    replica.ensure_interface(&path_str);

    let props = get_all(connection, path.as_str(), IFACE_INTERFACE).await?;
    let mut bss_paths = Vec::new();
    for (key, value) in &props {
        if let Some(iface_value) = transport::iface_prop_value(key, value) {
            for event in replica.apply_interface_property(&path_str, key, &iface_value) {
                match event {
                    InterfaceEvent::BssPathSeen(bss_path) => {
                        bss_paths.push(OwnedObjectPath::try_from(bss_path).unwrap_or_else(|_| path.clone()));
                    }
                    InterfaceEvent::ScanStarted => replica.scan_started(&path_str),
                    InterfaceEvent::NetworkAdded(_) | InterfaceEvent::NetworkRemoved(_) => {}
                }
            }
        }
    }
    replica.finish_interface_bag(&path_str);

    for bss_path in bss_paths {
        if let Err(e) = adopt_bss(connection, replica, &path_str, bss_path).await {
            warn!(error = %e, "failed to bootstrap a BSS");
        }
    }

    let handle = spawn_interface_watcher(connection, path_str.clone(), events_tx.clone());
    iface_tasks.insert(path_str, handle);
    Ok(())
}

async fn adopt_bss(
    connection: &Connection,
    replica: &mut Replica,
    iface_path: &str,
    bss_path: OwnedObjectPath,
) -> Result<(), Error> {
    let props = get_all(connection, bss_path.as_str(), BSS_INTERFACE).await?;
    let mut builder = crate::bss::BssBuilder::new();
    for (key, value) in &props {
        if let Some(v) = transport::bss_prop_value(key, value) {
            builder.apply(key, &v);
        }
    }
    replica.bss_added(iface_path, builder.finish(bss_path.to_string()));
    Ok(())
}

async fn get_all(
    connection: &Connection,
    path: &str,
    interface: &str,
) -> Result<HashMap<String, OwnedValue>, Error> {
    let props = PropertiesProxy::builder(connection).path(path)?.build().await?;
    Ok(props.get_all(interface).await?)
}

async fn handle_event(
    connection: &Connection,
    replica: &mut Replica,
    events_tx: &mpsc::UnboundedSender<RouterEvent>,
    iface_tasks: &mut HashMap<String, AbortHandle>,
    event: RouterEvent,
) -> Result<(), Error> {
    match event {
        RouterEvent::PeerLost => {
            for (_, handle) in iface_tasks.drain() {
                handle.abort();
            }
            replica.peer_lost();
        }
        RouterEvent::PeerReturned => {
            info!("supplicant peer returned");
            bootstrap(connection, replica, events_tx, iface_tasks).await?;
        }
        RouterEvent::InterfaceAdded(path) => {
            adopt_interface(connection, replica, events_tx, iface_tasks, path).await?;
        }
        RouterEvent::InterfaceRemoved(path) => {
            let path = path.to_string();
            if let Some(handle) = iface_tasks.remove(&path) {
                handle.abort();
            }
            replica.remove_interface(&path);
        }
        RouterEvent::RootPropertiesChanged(props) => {
            if let Some(methods) = props.get("EapMethods") {
                if let Ok(names) = Vec::<String>::try_from(methods) {
                    let mut flags = crate::types::EapMethods::empty();
                    for name in &names {
                        if let Some(bit) = crate::types::EapMethods::from_wire(name) {
                            flags |= bit;
                        }
                    }
                    replica.set_eap_methods(flags);
                }
            }
        }
        RouterEvent::IfacePropertiesChanged(iface_path, props) => {
            for (key, value) in &props {
                if let Some(v) = transport::iface_prop_value(key, value) {
                    let events = replica.apply_interface_property(&iface_path, key, &v);
                    for event in events {
                        match event {
                            InterfaceEvent::BssPathSeen(bss_path) => {
                                let Ok(bss_path) = OwnedObjectPath::try_from(bss_path) else {
                                    continue;
                                };
                                if let Err(e) = adopt_bss(connection, replica, &iface_path, bss_path).await {
                                    warn!(error = %e, "failed to populate a new BSS");
                                }
                            }
                            InterfaceEvent::ScanStarted => replica.scan_started(&iface_path),
                            InterfaceEvent::NetworkAdded(_) | InterfaceEvent::NetworkRemoved(_) => {}
                        }
                    }
                }
            }
        }
        RouterEvent::ScanDone(iface_path) => {
            replica.scan_done(&iface_path);
        }
        RouterEvent::BssAdded(iface_path, bss_path) => {
            if let Err(e) = adopt_bss(connection, replica, &iface_path, bss_path).await {
                warn!(error = %e, "failed to populate a new BSS");
            }
        }
        RouterEvent::BssRemoved(iface_path, bss_path) => {
            replica.bss_removed(&iface_path, &bss_path);
        }
        RouterEvent::NetworkAdded(iface_path, net_path) => {
            debug!(iface_path, net_path, "network object appeared (observational)");
        }
        RouterEvent::NetworkRemoved(iface_path, net_path) => {
            debug!(iface_path, net_path, "network object removed (observational)");
        }
    }
    Ok(())
}
