// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// A GTP-U Tunnel Endpoint Identifier.
///
/// The TEID occupies the full 32 bits of its wire field, so any
/// `u32` is a valid value.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Teid {
    inner: u32,
}

impl Teid {
    pub const fn new(val: u32) -> Self {
        Self { inner: val }
    }

    /// Return the TEID as it appears on the wire: four big-endian
    /// bytes.
    #[inline]
    pub fn bytes(&self) -> [u8; 4] {
        self.inner.to_be_bytes()
    }
}

impl From<u32> for Teid {
    fn from(val: u32) -> Self {
        Self { inner: val }
    }
}

impl From<Teid> for u32 {
    fn from(teid: Teid) -> Self {
        teid.inner
    }
}

impl Display for Teid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:08X}", self.inner)
    }
}

impl Debug for Teid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Teid {{ inner: {self} }}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn teid_round_trip() {
        let teid = Teid::new(0x11223344);
        assert_eq!([0x11, 0x22, 0x33, 0x44], teid.bytes());
        assert_eq!(0x11223344, u32::from(teid));
    }

    #[test]
    fn teid_display() {
        assert_eq!(format!("{}", Teid::new(0xFF)), "0x000000FF");
    }
}
