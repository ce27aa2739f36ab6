// Copyright 2017 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Closed error taxonomy (spec.md §7). `malformed-IE` and `out-of-memory`
//! have no variant here: the former is swallowed at the parse site and
//! never propagates, and the latter has no representation in safe Rust (the
//! global allocator aborts the process instead of returning `Err`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No connection to the supplicant service; control operations reject
    /// with this before issuing any RPC.
    #[error("supplicant peer is not available")]
    PeerUnavailable,

    /// A `GetAll` or method call to the peer failed at the transport level.
    #[error("supplicant transport error: {0}")]
    Transport(#[from] zbus::Error),

    /// An object path was expected to already be present in the replica
    /// but wasn't.
    #[error("object not found in replica: {0}")]
    NotFound(String),

    /// A reply was missing a field this crate requires.
    #[error("invalid reply: missing field {0}")]
    InvalidReply(&'static str),
}
