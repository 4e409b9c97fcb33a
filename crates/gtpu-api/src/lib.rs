// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! API types shared between the GTP-U engine and its control plane.
//!
//! The control plane provisions tunnel parameters out-of-band; the
//! engine only ever reads them. Everything in this crate is plain
//! data with serde derives so the control plane can pick whatever
//! wire format it likes.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod cfg;
pub mod ip;
pub mod mac;
pub mod teid;

pub use cfg::*;
pub use ip::*;
pub use mac::*;
pub use teid::*;

/// The overall version of the API. Anytime an API is added, removed,
/// or modified, this number should increment. Currently we attach no
/// semantic meaning to the number other than as a means to verify
/// that the engine and control plane are compiled for the same API.
pub const API_VERSION: u64 = 1;
