//! ARP — wire codec, request/reply builders, ingress handling.
//!
//! Implements RFC 826 ARP for Ethernet/IPv4, restricted to what a router
//! needs:
//!
//! - **Request** (`oper=1`) targeting one of our interface addresses: answer
//!   with a unicast reply carrying that interface's MAC.
//! - **Reply** (`oper=2`): install the sender in the ARP cache and flush any
//!   packets that were queued waiting for it, in arrival order.
//! - Anything else is dropped.
//!
//! Addresses are compared as [`Ipv4Addr`] (network byte order) end to end,
//! so the cache key written here is the same representation the egress path
//! looks up.

use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::clock::Clock;
use crate::iface::Interface;
use crate::netdev::FrameDriver;
use crate::router::Router;
use crate::types::{DropReason, Ipv4Addr, MacAddr};
use crate::{
    ARP_HLEN_ETHERNET, ARP_HTYPE_ETHERNET, ARP_OPER_REPLY, ARP_OPER_REQUEST, ARP_PACKET_LEN,
    ARP_PLEN_IPV4, ARP_PTYPE_IPV4, ETH_HEADER_LEN, ETHERTYPE_ARP, ethernet,
};

// =============================================================================
// Wire codec
// =============================================================================

/// Decoded ARP packet (Ethernet/IPv4 flavor only).
#[derive(Clone, Copy, Debug)]
pub struct ArpPacket {
    pub oper: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Parse an ARP packet (the bytes after the Ethernet header).
    ///
    /// Rejects hardware/protocol combinations other than Ethernet + IPv4.
    pub fn parse(data: &[u8]) -> Result<Self, DropReason> {
        if data.len() < ARP_PACKET_LEN {
            return Err(DropReason::TooShort);
        }

        let htype = u16::from_be_bytes([data[0], data[1]]);
        let ptype = u16::from_be_bytes([data[2], data[3]]);
        let hlen = data[4];
        let plen = data[5];
        if htype != ARP_HTYPE_ETHERNET
            || ptype != ARP_PTYPE_IPV4
            || hlen != ARP_HLEN_ETHERNET
            || plen != ARP_PLEN_IPV4
        {
            return Err(DropReason::Malformed);
        }

        Ok(Self {
            oper: u16::from_be_bytes([data[6], data[7]]),
            sender_mac: MacAddr([data[8], data[9], data[10], data[11], data[12], data[13]]),
            sender_ip: Ipv4Addr([data[14], data[15], data[16], data[17]]),
            target_mac: MacAddr([data[18], data[19], data[20], data[21], data[22], data[23]]),
            target_ip: Ipv4Addr([data[24], data[25], data[26], data[27]]),
        })
    }
}

fn emit(buf: &mut [u8], oper: u16, sha: MacAddr, sip: Ipv4Addr, tha: MacAddr, tip: Ipv4Addr) {
    if buf.len() < ARP_PACKET_LEN {
        return;
    }
    buf[0..2].copy_from_slice(&ARP_HTYPE_ETHERNET.to_be_bytes());
    buf[2..4].copy_from_slice(&ARP_PTYPE_IPV4.to_be_bytes());
    buf[4] = ARP_HLEN_ETHERNET;
    buf[5] = ARP_PLEN_IPV4;
    buf[6..8].copy_from_slice(&oper.to_be_bytes());
    buf[8..14].copy_from_slice(&sha.0);
    buf[14..18].copy_from_slice(&sip.0);
    buf[18..24].copy_from_slice(&tha.0);
    buf[24..28].copy_from_slice(&tip.0);
}

/// Build a broadcast ARP request frame asking for `target_ip` on `iface`.
pub fn build_request(iface: &Interface, target_ip: Ipv4Addr) -> Vec<u8> {
    let mut frame = vec![0u8; ETH_HEADER_LEN + ARP_PACKET_LEN];
    ethernet::emit(&mut frame, MacAddr::BROADCAST, iface.mac, ETHERTYPE_ARP);
    emit(
        &mut frame[ETH_HEADER_LEN..],
        ARP_OPER_REQUEST,
        iface.mac,
        iface.addr,
        MacAddr::ZERO,
        target_ip,
    );
    frame
}

/// Build a unicast ARP reply frame answering `target` for `iface`'s address.
pub fn build_reply(iface: &Interface, target_mac: MacAddr, target_ip: Ipv4Addr) -> Vec<u8> {
    let mut frame = vec![0u8; ETH_HEADER_LEN + ARP_PACKET_LEN];
    ethernet::emit(&mut frame, target_mac, iface.mac, ETHERTYPE_ARP);
    emit(
        &mut frame[ETH_HEADER_LEN..],
        ARP_OPER_REPLY,
        iface.mac,
        iface.addr,
        target_mac,
        target_ip,
    );
    frame
}

// =============================================================================
// Ingress
// =============================================================================

/// Handle a received ARP packet (the bytes after the Ethernet header).
pub(crate) fn handle_rx<D: FrameDriver, C: Clock>(
    router: &Router<D, C>,
    iface: &Interface,
    payload: &[u8],
) {
    let pkt = match ArpPacket::parse(payload) {
        Ok(pkt) => pkt,
        Err(reason) => {
            debug!("arp: drop on {}: {}", iface.name, reason);
            return;
        }
    };

    match pkt.oper {
        ARP_OPER_REQUEST => {
            if pkt.target_ip == iface.addr {
                debug!(
                    "arp: request for {} from {} ({}), sending reply",
                    pkt.target_ip, pkt.sender_ip, pkt.sender_mac
                );
                let reply = build_reply(iface, pkt.sender_mac, pkt.sender_ip);
                router.driver().send_frame(iface, &reply);
            }
        }
        ARP_OPER_REPLY => {
            debug!("arp: reply {} is-at {}", pkt.sender_ip, pkt.sender_mac);
            let now = router.now();
            if let Some(record) = router.cache().insert(pkt.sender_ip, pkt.sender_mac, now) {
                router.flush_pending(record, pkt.sender_mac);
            }
        }
        other => {
            debug!("arp: unknown opcode {}", other);
        }
    }
}
