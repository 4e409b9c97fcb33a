// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Packet counters for the encapsulation pipeline.
//!
//! The engine never owns file-scope mutable state; whoever hosts it
//! injects a [`StatSink`] and decides where the numbers go (kstat,
//! prometheus, a test vector). The default [`EncapStats`] provider is
//! a set of relaxed atomics, which is all a per-packet increment
//! needs.

use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering::Relaxed;
use serde::Deserialize;
use serde::Serialize;

/// A countable pipeline event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncapStat {
    /// A packet was fully encapsulated and forwarded.
    Forwarded,
    /// A packet was dropped, for any reason.
    Dropped,
    /// A required config field was absent.
    ConfigMissing,
    /// A header window fell outside the buffer.
    BufferTooSmall,
    /// Headroom growth was refused.
    RoomReservationFailed,
    /// The inner packet exceeded what the length fields can carry.
    PayloadTooLong,
}

/// Where pipeline events get counted.
pub trait StatSink {
    fn increment(&self, stat: EncapStat);
}

/// The default stat provider.
#[derive(Debug, Default)]
pub struct EncapStats {
    out_pkts: AtomicU64,
    drops: AtomicU64,
    config_missing: AtomicU64,
    buffer_too_small: AtomicU64,
    room_reservation_failed: AtomicU64,
    payload_too_long: AtomicU64,
}

impl EncapStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a point-in-time copy of the counters.
    pub fn snapshot(&self) -> EncapCounters {
        EncapCounters {
            out_pkts: self.out_pkts.load(Relaxed),
            drops: self.drops.load(Relaxed),
            config_missing: self.config_missing.load(Relaxed),
            buffer_too_small: self.buffer_too_small.load(Relaxed),
            room_reservation_failed: self.room_reservation_failed.load(Relaxed),
            payload_too_long: self.payload_too_long.load(Relaxed),
        }
    }
}

impl StatSink for EncapStats {
    fn increment(&self, stat: EncapStat) {
        let counter = match stat {
            EncapStat::Forwarded => &self.out_pkts,
            EncapStat::Dropped => &self.drops,
            EncapStat::ConfigMissing => &self.config_missing,
            EncapStat::BufferTooSmall => &self.buffer_too_small,
            EncapStat::RoomReservationFailed => &self.room_reservation_failed,
            EncapStat::PayloadTooLong => &self.payload_too_long,
        };
        counter.fetch_add(1, Relaxed);
    }
}

/// A plain-data snapshot of [`EncapStats`], shippable to whoever
/// asked.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EncapCounters {
    pub out_pkts: u64,
    pub drops: u64,
    pub config_missing: u64,
    pub buffer_too_small: u64,
    pub room_reservation_failed: u64,
    pub payload_too_long: u64,
}

/// A sink for hosts that do not care about counters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl StatSink for NullSink {
    fn increment(&self, _stat: EncapStat) {}
}
