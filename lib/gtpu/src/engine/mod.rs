// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The encapsulation engine.
//!
//! Leaves first: checksum arithmetic, the four header builders, the
//! packet buffer with its headroom reservation, and on top of those
//! the [`encap::Encapsulator`] pipeline which turns an inner IPv4
//! packet into a GTP-U tunnel frame and a [`encap::Verdict`].

pub mod checksum;
pub mod config;
pub mod encap;
pub mod ether;
pub mod gtpu;
pub mod ip4;
pub mod packet;
pub mod stat;
pub mod udp;
