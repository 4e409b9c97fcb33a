// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Types for calculating the internet checksum.
//!
//! The [`Checksum`] type provides a rolling one's complement sum,
//! allowing one to build up (or incrementally update) a sum before
//! finalizing it into a [`HeaderChecksum`], which is the value stored
//! in the actual header bytes.
//!
//! A note on endianness: the checksum is not a logical integer, it is
//! a pair of bytes. Each pair of summed bytes is treated as a native
//! 16-bit integer, and the finalized sum is stored back with the same
//! native conversion. As the input bytes are in network order, the
//! stored bytes come out in network order too; no byte-order
//! conversion is ever performed on the checksum field. RFC 1071
//! section 1.B covers why this works on either endianness.
//!
//! Relevant RFCs:
//!
//! * 1071 Computing the Internet Checksum
//!
//! * 1141 Incremental Updating of the Internet Checksum
//!
//! * 1624 Computation of the Internet Checksum via Incremental Update

/// The checksum value, as it is contained in a network header.
///
/// This holds the bytes as they are stored in the header itself,
/// i.e. with one's complement applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderChecksum {
    inner: [u8; 2],
}

impl HeaderChecksum {
    /// Return the bytes of this header checksum.
    pub fn bytes(&self) -> [u8; 2] {
        self.inner
    }

    /// Wrap a pair of header bytes which represent a checksum --
    /// i.e., the one's complement of a one's complement sum.
    pub fn wrap(hc: [u8; 2]) -> Self {
        Self { inner: hc }
    }
}

impl From<Checksum> for HeaderChecksum {
    /// Finalize the rolling checksum and put it into header form by
    /// performing one's complement.
    fn from(mut csum: Checksum) -> HeaderChecksum {
        // See the module-level comment about why it's important to
        // convert using native-endian.
        Self { inner: (!csum.finalize()).to_ne_bytes() }
    }
}

/// A rolling one's complement checksum calculation.
///
/// Carries are not folded until the finalized sum is needed, so bytes
/// may be added (or subtracted, for incremental rewrites of existing
/// headers) cheaply in any order.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Checksum {
    inner: u32,
}

impl Checksum {
    /// Creates a new checksum counter.
    pub fn new() -> Self {
        Self::from(0)
    }

    /// Create a new rolling checksum, starting with the passed in
    /// `bytes`.
    pub fn compute(bytes: &[u8]) -> Self {
        Self { inner: csum_add(0, bytes) }
    }

    /// Update the sum by adding the contents of `bytes`.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_add(self.inner, bytes);
    }

    /// Update the sum by subtracting the contents of `bytes`.
    ///
    /// This is useful for incrementally updating an existing checksum
    /// where only a portion of the bytes are being rewritten.
    pub fn sub_bytes(&mut self, bytes: &[u8]) {
        self.inner = csum_sub(self.inner, bytes);
    }

    /// Finalize the sum by folding all accumulated carries and
    /// returning the resulting value as a `u16`.
    pub fn finalize(&mut self) -> u16 {
        while (self.inner >> 16) != 0 {
            self.inner = (self.inner >> 16) + (self.inner & 0xFFFF);
        }

        (self.inner & 0xFFFF) as u16
    }
}

impl From<HeaderChecksum> for Checksum {
    // Convert a header's checksum bytes back into a rolling checksum.
    fn from(hc: HeaderChecksum) -> Self {
        // See the module-level comment about why it's important to
        // convert using native-endian.
        Self { inner: (!u16::from_ne_bytes(hc.bytes())) as u32 }
    }
}

impl From<u32> for Checksum {
    fn from(csum: u32) -> Self {
        Self { inner: csum }
    }
}

impl core::ops::Add for Checksum {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { inner: self.inner + other.inner }
    }
}

impl core::ops::AddAssign for Checksum {
    fn add_assign(&mut self, other: Self) {
        self.inner += other.inner
    }
}

/// Incrementally update a stored header checksum for a single
/// rewritten field, per RFC 1624.
///
/// `old` and `new` are the field's bytes before and after the
/// rewrite. The result is bit-for-bit identical to recomputing the
/// checksum over the final header bytes from scratch.
pub fn update(hc: HeaderChecksum, old: &[u8], new: &[u8]) -> HeaderChecksum {
    let mut csum = Checksum::from(hc);
    csum.sub_bytes(old);
    csum.add_bytes(new);
    HeaderChecksum::from(csum)
}

fn csum_add(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut len = bytes.len();
    let mut pos = 0;

    while len > 1 {
        // See the module-level comment about why it's important to
        // convert using native-endian.
        csum += (u16::from_ne_bytes([bytes[pos], bytes[pos + 1]])) as u32;
        pos += 2;
        len -= 2;
    }

    if len == 1 {
        csum += bytes[pos] as u32;
    }

    csum
}

fn csum_sub(mut csum: u32, bytes: &[u8]) -> u32 {
    let mut len = bytes.len();
    let mut pos = 0;

    while len > 1 {
        let sub = (!u16::from_ne_bytes([bytes[pos], bytes[pos + 1]])) as u32;
        csum += sub;
        pos += 2;
        len -= 2;
    }

    if len == 1 {
        csum += (!bytes[pos]) as u32;
    }

    csum
}

#[cfg(test)]
mod test {
    use super::*;

    // RFC 1071 example words, adjusted to bytes.
    #[test]
    fn one_shot() {
        let bytes = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        let mut csum = Checksum::compute(&bytes);
        assert_eq!(csum.finalize(), u16::from_ne_bytes([0xdd, 0xf2]));
    }

    #[test]
    fn rolling_matches_one_shot() {
        let bytes = [0x45, 0x00, 0x00, 0x54, 0x00, 0x00, 0x40, 0x00];
        let one_shot = Checksum::compute(&bytes);

        // Chunks must stay 16-bit aligned for the sums to agree.
        let mut rolling = Checksum::new();
        rolling.add_bytes(&bytes[..4]);
        rolling.add_bytes(&bytes[4..]);

        let mut a = one_shot;
        let mut b = rolling;
        assert_eq!(a.finalize(), b.finalize());
    }

    #[test]
    fn incremental_update_matches_recompute() {
        let mut hdr = [
            0x45, 0x00, 0x00, 0x54, 0x00, 0x00, 0x00, 0x00, 0x40, 0x11, 0x00,
            0x00, 0x0a, 0x0a, 0x0a, 0x01, 0x0a, 0x0a, 0x0a, 0x02,
        ];
        let hc = HeaderChecksum::from(Checksum::compute(&hdr));
        hdr[10..12].copy_from_slice(&hc.bytes());

        // Rewrite the total length field and update incrementally.
        let old = [hdr[2], hdr[3]];
        let new = [0x00, 0x62];
        hdr[2..4].copy_from_slice(&new);
        let updated = update(hc, &old, &new);

        hdr[10..12].copy_from_slice(&[0; 2]);
        let recomputed = HeaderChecksum::from(Checksum::compute(&hdr));
        assert_eq!(updated.bytes(), recomputed.bytes());
    }

    #[test]
    fn odd_length_tail() {
        let bytes = [0x01, 0x02, 0x03];
        let mut csum = Checksum::compute(&bytes);
        let mut expect = Checksum::new();
        expect.add_bytes(&[0x01, 0x02]);
        expect.add_bytes(&[0x03]);
        assert_eq!(csum.finalize(), expect.finalize());
    }
}
