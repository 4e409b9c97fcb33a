// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The tunnel configuration store.
//!
//! The control plane writes tunnel parameters out-of-band; the engine
//! reads them fresh for every packet. Each field read is torn-free,
//! but no consistency across fields is guaranteed during a concurrent
//! update: a packet may observe a new TEID alongside an old peer
//! address. That window is a documented limitation of the single-slot
//! store, not something the engine papers over.

use core::fmt;
use core::fmt::Display;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::AtomicU8;
use core::sync::atomic::Ordering::Relaxed;
use gtpu_api::EgressId;
use gtpu_api::Ipv4Addr;
use gtpu_api::MacAddr;
use gtpu_api::Teid;
use gtpu_api::TunnelCfg;
use gtpu_api::UdpCsumPolicy;

/// The fields the store carries. Used to name the absent field in
/// errors and counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigField {
    SrcMac,
    DstMac,
    SrcIp,
    DstIp,
    Teid,
    Egress,
}

impl Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::SrcMac => "src-mac",
            Self::DstMac => "dst-mac",
            Self::SrcIp => "src-ip",
            Self::DstIp => "dst-ip",
            Self::Teid => "teid",
            Self::Egress => "egress",
        };
        write!(f, "{name}")
    }
}

/// Read access to tunnel configuration, one getter per field.
///
/// Every getter is independent; implementations must make each read
/// torn-free but are not required to provide cross-field atomicity.
/// The trait exists so a keyed, multi-tenant store can slot in behind
/// the engine later; this crate ships the single-tenant
/// [`SingleTunnelStore`].
pub trait TunnelStore {
    fn src_mac(&self) -> Option<MacAddr>;
    fn dst_mac(&self) -> Option<MacAddr>;
    fn src_ip(&self) -> Option<Ipv4Addr>;
    fn dst_ip(&self) -> Option<Ipv4Addr>;
    fn teid(&self) -> Option<Teid>;

    /// The optional egress target for forwarded packets.
    fn egress(&self) -> Option<EgressId>;

    /// The outer UDP checksum policy. Always present; defaults to
    /// [`UdpCsumPolicy::Zeroed`].
    fn udp_csum_policy(&self) -> UdpCsumPolicy;
}

// Each optional field packs into one atomic word with a presence bit
// above the value: 0 means unset. A MAC occupies the low 48 bits, a
// word-sized value the low 32.
const PRESENT_48: u64 = 1 << 48;
const PRESENT_32: u64 = 1 << 32;

/// The single-tenant store: one value slot per field, each an atomic
/// word.
#[derive(Default)]
pub struct SingleTunnelStore {
    src_mac: AtomicU64,
    dst_mac: AtomicU64,
    src_ip: AtomicU64,
    dst_ip: AtomicU64,
    teid: AtomicU64,
    egress: AtomicU64,
    udp_csum: AtomicU8,
}

fn pack_mac(mac: MacAddr) -> u64 {
    let b = mac.bytes();
    let mut val = 0u64;
    for byte in b {
        val = (val << 8) | u64::from(byte);
    }
    PRESENT_48 | val
}

fn unpack_mac(val: u64) -> Option<MacAddr> {
    if val & PRESENT_48 == 0 {
        return None;
    }

    let raw = (val & (PRESENT_48 - 1)).to_be_bytes();
    Some(MacAddr::from([raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]))
}

fn unpack_u32(val: u64) -> Option<u32> {
    if val & PRESENT_32 == 0 {
        return None;
    }

    Some(val as u32)
}

impl SingleTunnelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from a [`TunnelCfg`].
    pub fn from_cfg(cfg: &TunnelCfg) -> Self {
        let store = Self::new();
        store.apply(cfg);
        store
    }

    /// Apply a full configuration, field by field.
    ///
    /// This is NOT atomic across fields; a packet processed
    /// concurrently may observe a mix of old and new values.
    pub fn apply(&self, cfg: &TunnelCfg) {
        self.set_src_mac(cfg.src_mac);
        self.set_dst_mac(cfg.dst_mac);
        self.set_src_ip(cfg.src_ip);
        self.set_dst_ip(cfg.dst_ip);
        self.set_teid(cfg.teid);
        if let Some(egress) = cfg.egress {
            self.set_egress(egress);
        }
        self.set_udp_csum_policy(cfg.udp_csum);
    }

    pub fn set_src_mac(&self, mac: MacAddr) {
        self.src_mac.store(pack_mac(mac), Relaxed);
    }

    pub fn set_dst_mac(&self, mac: MacAddr) {
        self.dst_mac.store(pack_mac(mac), Relaxed);
    }

    pub fn set_src_ip(&self, ip: Ipv4Addr) {
        self.src_ip.store(PRESENT_32 | u64::from(ip.to_be()), Relaxed);
    }

    pub fn set_dst_ip(&self, ip: Ipv4Addr) {
        self.dst_ip.store(PRESENT_32 | u64::from(ip.to_be()), Relaxed);
    }

    pub fn set_teid(&self, teid: Teid) {
        self.teid.store(PRESENT_32 | u64::from(u32::from(teid)), Relaxed);
    }

    pub fn set_egress(&self, egress: EgressId) {
        self.egress.store(PRESENT_32 | u64::from(egress.0), Relaxed);
    }

    pub fn clear_egress(&self) {
        self.egress.store(0, Relaxed);
    }

    pub fn set_udp_csum_policy(&self, policy: UdpCsumPolicy) {
        let raw = match policy {
            UdpCsumPolicy::Zeroed => 0,
            UdpCsumPolicy::Full => 1,
        };
        self.udp_csum.store(raw, Relaxed);
    }
}

impl TunnelStore for SingleTunnelStore {
    fn src_mac(&self) -> Option<MacAddr> {
        unpack_mac(self.src_mac.load(Relaxed))
    }

    fn dst_mac(&self) -> Option<MacAddr> {
        unpack_mac(self.dst_mac.load(Relaxed))
    }

    fn src_ip(&self) -> Option<Ipv4Addr> {
        unpack_u32(self.src_ip.load(Relaxed)).map(Ipv4Addr::from_be)
    }

    fn dst_ip(&self) -> Option<Ipv4Addr> {
        unpack_u32(self.dst_ip.load(Relaxed)).map(Ipv4Addr::from_be)
    }

    fn teid(&self) -> Option<Teid> {
        unpack_u32(self.teid.load(Relaxed)).map(Teid::new)
    }

    fn egress(&self) -> Option<EgressId> {
        unpack_u32(self.egress.load(Relaxed)).map(EgressId)
    }

    fn udp_csum_policy(&self) -> UdpCsumPolicy {
        match self.udp_csum.load(Relaxed) {
            0 => UdpCsumPolicy::Zeroed,
            _ => UdpCsumPolicy::Full,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_store_has_no_fields() {
        let store = SingleTunnelStore::new();
        assert_eq!(store.src_mac(), None);
        assert_eq!(store.dst_mac(), None);
        assert_eq!(store.src_ip(), None);
        assert_eq!(store.dst_ip(), None);
        assert_eq!(store.teid(), None);
        assert_eq!(store.egress(), None);
        assert_eq!(store.udp_csum_policy(), UdpCsumPolicy::Zeroed);
    }

    #[test]
    fn fields_round_trip() {
        let store = SingleTunnelStore::new();

        let mac = MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]);
        store.set_src_mac(mac);
        assert_eq!(store.src_mac(), Some(mac));

        // The all-zero MAC is a value, not absence.
        store.set_dst_mac(MacAddr::ZERO);
        assert_eq!(store.dst_mac(), Some(MacAddr::ZERO));

        let ip = "10.10.10.1".parse::<Ipv4Addr>().unwrap();
        store.set_dst_ip(ip);
        assert_eq!(store.dst_ip(), Some(ip));

        store.set_teid(Teid::new(0));
        assert_eq!(store.teid(), Some(Teid::new(0)));

        store.set_egress(EgressId(5));
        assert_eq!(store.egress(), Some(EgressId(5)));
        store.clear_egress();
        assert_eq!(store.egress(), None);
    }
}
