// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The encapsulation pipeline.
//!
//! One invocation per packet: resolve tunnel parameters, reserve room
//! for all four outer headers, emit Ethernet, IPv4, UDP, and GTP-U in
//! order, yield a [`Verdict`]. The pipeline is fail-fast: the first
//! error at any stage drops the packet. There is no retry and no
//! partial rollback, so a packet that fails midway is never forwarded
//! half-built.

use super::config::ConfigField;
use super::config::TunnelStore;
use super::ether::ETHER_HDR_LEN;
use super::ether::EtherMeta;
use super::gtpu::GTPU_HDR_LEN;
use super::gtpu::GTPU_PORT;
use super::gtpu::GtpuMeta;
use super::ip4::IPV4_HDR_LEN;
use super::ip4::Ipv4Meta;
use super::packet::PacketBuf;
use super::packet::SegAdjustError;
use super::packet::WriteError;
use super::stat::EncapStat;
use super::stat::StatSink;
use super::udp::UDP_HDR_LEN;
use super::udp::UdpMeta;
use gtpu_api::EgressId;
use gtpu_api::Ipv4Addr;
use gtpu_api::MacAddr;
use gtpu_api::Teid;
use gtpu_api::UdpCsumPolicy;
use thiserror::Error;

pub const ETHER_OFF: usize = 0;
pub const IPV4_OFF: usize = ETHER_OFF + ETHER_HDR_LEN;
pub const UDP_OFF: usize = IPV4_OFF + IPV4_HDR_LEN;
pub const GTPU_OFF: usize = UDP_OFF + UDP_HDR_LEN;

/// Total length of the prepended outer headers: 14 + 20 + 8 + 8.
pub const ENCAP_HDR_LEN: usize = GTPU_OFF + GTPU_HDR_LEN;

/// The longest inner packet whose outer IPv4 total length still fits
/// in 16 bits.
pub const MAX_INNER_LEN: usize =
    u16::MAX as usize - (IPV4_HDR_LEN + UDP_HDR_LEN + GTPU_HDR_LEN);

/// The terminal per-packet outcome.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The packet was encapsulated; send it on. `Some` names the
    /// configured egress, `None` means continue with the caller's
    /// next processing stage.
    Forward(Option<EgressId>),
    /// Discard the packet.
    Drop,
    /// Discard the packet; the invocation itself broke its contract
    /// (e.g. an inner packet no valid tunnel frame can carry).
    Abort,
}

/// Everything that can sink a packet, all terminal.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum EncapError {
    #[error("required config field absent: {0}")]
    ConfigMissing(ConfigField),
    #[error(transparent)]
    BufferTooSmall(#[from] WriteError),
    #[error("headroom growth refused: {0}")]
    RoomReservationFailed(#[from] SegAdjustError),
    #[error("inner packet too long for the length fields: {len} bytes")]
    PayloadTooLong { len: usize },
}

impl EncapError {
    fn stat(&self) -> EncapStat {
        match self {
            Self::ConfigMissing(_) => EncapStat::ConfigMissing,
            Self::BufferTooSmall(_) => EncapStat::BufferTooSmall,
            Self::RoomReservationFailed(_) => EncapStat::RoomReservationFailed,
            Self::PayloadTooLong { .. } => EncapStat::PayloadTooLong,
        }
    }

    fn verdict(&self) -> Verdict {
        match self {
            Self::PayloadTooLong { .. } => Verdict::Abort,
            _ => Verdict::Drop,
        }
    }
}

/// The five addressing values a tunnel frame needs, resolved fresh
/// from the store for every packet.
#[derive(Clone, Copy, Debug)]
pub struct TunnelParams {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub teid: Teid,
}

/// The encapsulator. Stateless across packets; owns nothing but its
/// view of the config store and the stat sink.
pub struct Encapsulator<'a> {
    store: &'a dyn TunnelStore,
    stats: &'a dyn StatSink,
}

impl<'a> Encapsulator<'a> {
    pub fn new(store: &'a dyn TunnelStore, stats: &'a dyn StatSink) -> Self {
        Self { store, stats }
    }

    /// Run one packet through the pipeline.
    ///
    /// On success the buffer holds the finished tunnel frame and the
    /// verdict says where it goes. On any failure the verdict is
    /// terminal and the packet must not be transmitted.
    pub fn process(&self, pkt: &mut PacketBuf) -> Verdict {
        match self.encap(pkt) {
            Ok(verdict) => {
                self.stats.increment(EncapStat::Forwarded);
                verdict
            }
            Err(e) => {
                self.stats.increment(e.stat());
                self.stats.increment(EncapStat::Dropped);
                e.verdict()
            }
        }
    }

    /// Resolve the required parameters, failing on the first absent
    /// field.
    fn params(&self) -> Result<TunnelParams, EncapError> {
        use EncapError::ConfigMissing;

        Ok(TunnelParams {
            src_mac: self
                .store
                .src_mac()
                .ok_or(ConfigMissing(ConfigField::SrcMac))?,
            dst_mac: self
                .store
                .dst_mac()
                .ok_or(ConfigMissing(ConfigField::DstMac))?,
            src_ip: self
                .store
                .src_ip()
                .ok_or(ConfigMissing(ConfigField::SrcIp))?,
            dst_ip: self
                .store
                .dst_ip()
                .ok_or(ConfigMissing(ConfigField::DstIp))?,
            teid: self.store.teid().ok_or(ConfigMissing(ConfigField::Teid))?,
        })
    }

    fn encap(&self, pkt: &mut PacketBuf) -> Result<Verdict, EncapError> {
        let params = self.params()?;
        // Read once per packet; the policy is never re-read midway.
        let csum_policy = self.store.udp_csum_policy();

        let inner_len = pkt.len();
        if inner_len > MAX_INNER_LEN {
            return Err(EncapError::PayloadTooLong { len: inner_len });
        }
        let inner_len = inner_len as u16;

        pkt.expand_front(ENCAP_HDR_LEN)?;

        let eth = EtherMeta { dst: params.dst_mac, src: params.src_mac };
        eth.emit(pkt.window(ETHER_OFF, ETHER_HDR_LEN)?);

        let mut ip = Ipv4Meta {
            src: params.src_ip,
            dst: params.dst_ip,
            total_len: (IPV4_HDR_LEN + UDP_HDR_LEN + GTPU_HDR_LEN) as u16
                + inner_len,
            ..Default::default()
        };
        ip.compute_hdr_csum();
        ip.emit(pkt.window(IPV4_OFF, IPV4_HDR_LEN)?);

        let mut udp = UdpMeta {
            src: GTPU_PORT,
            dst: GTPU_PORT,
            len: (UDP_HDR_LEN + GTPU_HDR_LEN) as u16 + inner_len,
            csum: [0; 2],
        };
        udp.emit(pkt.window(UDP_OFF, UDP_HDR_LEN)?);

        let gtpu = GtpuMeta { teid: params.teid, payload_len: inner_len };
        gtpu.emit(pkt.window(GTPU_OFF, GTPU_HDR_LEN)?);

        // The full checksum covers bytes that only exist once the
        // GTP-U header is in place, hence the re-emit.
        if csum_policy == UdpCsumPolicy::Full {
            udp.compute_csum(&ip, &pkt.bytes()[GTPU_OFF..]);
            udp.emit(pkt.window(UDP_OFF, UDP_HDR_LEN)?);
        }

        Ok(Verdict::Forward(self.store.egress()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::checksum::Checksum;
    use crate::engine::config::SingleTunnelStore;
    use crate::engine::stat::EncapStats;
    use gtpu_api::TunnelCfg;

    fn test_cfg() -> TunnelCfg {
        TunnelCfg {
            src_mac: "A8:40:25:00:00:01".parse().unwrap(),
            dst_mac: "A8:40:25:00:00:02".parse().unwrap(),
            src_ip: "10.10.10.1".parse().unwrap(),
            dst_ip: "10.10.10.2".parse().unwrap(),
            teid: Teid::new(0x11223344),
            egress: None,
            udp_csum: UdpCsumPolicy::Zeroed,
        }
    }

    fn run(cfg: &TunnelCfg, inner: &[u8]) -> (Verdict, PacketBuf, EncapStats) {
        let store = SingleTunnelStore::from_cfg(cfg);
        let stats = EncapStats::new();
        let mut pkt = PacketBuf::new_with_headroom(ENCAP_HDR_LEN, inner);
        let verdict = Encapsulator::new(&store, &stats).process(&mut pkt);
        (verdict, pkt, stats)
    }

    #[test]
    fn scenario_46_byte_tpdu() {
        let inner = [0u8; 46];
        let (verdict, pkt, stats) = run(&test_cfg(), &inner);

        assert_eq!(verdict, Verdict::Forward(None));
        let out = pkt.bytes();
        assert_eq!(out.len(), 96);

        // Ethernet.
        assert_eq!(&out[0..6], &[0xA8, 0x40, 0x25, 0x00, 0x00, 0x02]);
        assert_eq!(&out[6..12], &[0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]);
        assert_eq!(&out[12..14], &[0x08, 0x00]);

        // GTP-U fixed bytes and TEID.
        assert_eq!(&out[42..44], &[0x30, 0xFF]);
        assert_eq!(&out[46..50], &[0x11, 0x22, 0x33, 0x44]);

        // The inner packet rides along unmodified.
        assert_eq!(&out[50..], &inner);

        assert_eq!(stats.snapshot().out_pkts, 1);
        assert_eq!(stats.snapshot().drops, 0);
    }

    #[test]
    fn length_fields_track_inner_len() {
        for inner_len in [0usize, 1, 46, 1400] {
            let inner = vec![0xA5u8; inner_len];
            let (verdict, pkt, _) = run(&test_cfg(), &inner);
            assert_eq!(verdict, Verdict::Forward(None));

            let out = pkt.bytes();
            assert_eq!(out.len(), ENCAP_HDR_LEN + inner_len);

            let ip_total = u16::from_be_bytes([out[16], out[17]]) as usize;
            let udp_len = u16::from_be_bytes([out[38], out[39]]) as usize;
            let gtpu_len = u16::from_be_bytes([out[44], out[45]]) as usize;

            assert_eq!(ip_total, 36 + inner_len);
            assert_eq!(udp_len, 16 + inner_len);
            assert_eq!(gtpu_len, inner_len);
        }
    }

    #[test]
    fn emitted_ip_csum_verifies() {
        let (_, pkt, _) = run(&test_cfg(), &[0u8; 46]);
        let mut csum = Checksum::compute(&pkt.bytes()[IPV4_OFF..UDP_OFF]);
        assert_eq!(csum.finalize(), 0xFFFF);
    }

    #[test]
    fn zeroed_policy_emits_zero_csum() {
        let (_, pkt, _) = run(&test_cfg(), &[0x55u8; 13]);
        assert_eq!(&pkt.bytes()[40..42], &[0x00, 0x00]);
    }

    #[test]
    fn full_policy_emits_verifiable_csum() {
        let cfg = TunnelCfg { udp_csum: UdpCsumPolicy::Full, ..test_cfg() };
        let (verdict, pkt, _) = run(&cfg, &[0x55u8; 13]);
        assert_eq!(verdict, Verdict::Forward(None));

        let out = pkt.bytes();
        assert_ne!(&out[40..42], &[0x00, 0x00]);

        // Pseudo header + entire UDP datagram, checksum included,
        // must fold to all ones.
        let udp_len = (out.len() - UDP_OFF) as u16;
        let mut pseudo = [0u8; 12];
        pseudo[0..4].copy_from_slice(&out[26..30]);
        pseudo[4..8].copy_from_slice(&out[30..34]);
        pseudo[9] = 17;
        pseudo[10..12].copy_from_slice(&udp_len.to_be_bytes());

        let mut csum = Checksum::compute(&pseudo);
        csum.add_bytes(&out[UDP_OFF..]);
        assert_eq!(csum.finalize(), 0xFFFF);
    }

    #[test]
    fn forward_names_configured_egress() {
        let cfg = TunnelCfg { egress: Some(EgressId(7)), ..test_cfg() };
        let (verdict, ..) = run(&cfg, &[0u8; 8]);
        assert_eq!(verdict, Verdict::Forward(Some(EgressId(7))));
    }

    #[test]
    fn missing_config_drops_untouched() {
        let cfg = test_cfg();
        let inner = [0x77u8; 32];

        let store = SingleTunnelStore::new();
        store.set_src_mac(cfg.src_mac);
        store.set_dst_mac(cfg.dst_mac);
        store.set_src_ip(cfg.src_ip);
        // dst_ip and teid left unset.

        let stats = EncapStats::new();
        let mut pkt = PacketBuf::new_with_headroom(ENCAP_HDR_LEN, &inner);
        let verdict = Encapsulator::new(&store, &stats).process(&mut pkt);

        assert_eq!(verdict, Verdict::Drop);
        // No headroom was consumed and no payload byte changed.
        assert_eq!(pkt.headroom(), ENCAP_HDR_LEN);
        assert_eq!(pkt.bytes(), &inner);

        let snap = stats.snapshot();
        assert_eq!(snap.config_missing, 1);
        assert_eq!(snap.drops, 1);
        assert_eq!(snap.out_pkts, 0);
    }

    #[test]
    fn each_missing_field_drops() {
        let cfg = test_cfg();
        let stats = EncapStats::new();

        for missing in 0..5 {
            let store = SingleTunnelStore::new();
            if missing != 0 {
                store.set_src_mac(cfg.src_mac);
            }
            if missing != 1 {
                store.set_dst_mac(cfg.dst_mac);
            }
            if missing != 2 {
                store.set_src_ip(cfg.src_ip);
            }
            if missing != 3 {
                store.set_dst_ip(cfg.dst_ip);
            }
            if missing != 4 {
                store.set_teid(cfg.teid);
            }

            let mut pkt = PacketBuf::new_with_headroom(ENCAP_HDR_LEN, &[0; 4]);
            let verdict = Encapsulator::new(&store, &stats).process(&mut pkt);
            assert_eq!(verdict, Verdict::Drop);
        }

        assert_eq!(stats.snapshot().config_missing, 5);
    }

    #[test]
    fn insufficient_headroom_drops() {
        let inner = [0x42u8; 24];
        let store = SingleTunnelStore::from_cfg(&test_cfg());
        let stats = EncapStats::new();

        // One byte short of the room the outer headers need.
        let mut pkt = PacketBuf::new_with_headroom(ENCAP_HDR_LEN - 1, &inner);
        let verdict = Encapsulator::new(&store, &stats).process(&mut pkt);

        assert_eq!(verdict, Verdict::Drop);
        assert_eq!(pkt.headroom(), ENCAP_HDR_LEN - 1);
        assert_eq!(pkt.bytes(), &inner);

        let snap = stats.snapshot();
        assert_eq!(snap.room_reservation_failed, 1);
        assert_eq!(snap.drops, 1);
    }

    #[test]
    fn oversize_inner_aborts() {
        let inner = vec![0u8; MAX_INNER_LEN + 1];
        let (verdict, _, stats) = run(&test_cfg(), &inner);
        assert_eq!(verdict, Verdict::Abort);
        assert_eq!(stats.snapshot().payload_too_long, 1);
    }
}
