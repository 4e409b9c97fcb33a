// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! GTP-U tunnel encapsulation engine.
//!
//! Given a plain IPv4 packet, the engine prepends
//! Ethernet/IPv4/UDP/GTP-U headers addressed to a user-plane peer and
//! yields a forwarding verdict. Tunnel parameters are read from a
//! shared configuration store which a control plane writes
//! out-of-band; the engine itself holds no per-packet state across
//! invocations.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

pub mod engine;

pub use gtpu_api as api;
