//! culvert — the data plane of a small static IPv4 router.
//!
//! The router ingests raw Ethernet frames from a set of named interfaces,
//! answers what is addressed to the router itself (ARP requests for an
//! interface address, ICMP echo), and forwards everything else toward a next
//! hop chosen by longest-prefix match over a static route table.  Next-hop
//! link-layer addresses are resolved through an ARP cache with a
//! timeout-driven request state machine; packets awaiting resolution are
//! queued and flushed in arrival order when the reply comes in, or answered
//! with ICMP host-unreachable when it never does.
//!
//! # Architecture
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`ethernet`], [`arp`], [`ipv4`], [`icmp`] | wire codecs and per-protocol ingress handling |
//! | [`route`] | static route table with longest-prefix-match lookup |
//! | [`neighbor`] | ARP cache, pending-packet queues, retransmit sweep |
//! | [`router`] | the [`Router`] context object: ingress dispatch and egress |
//! | [`iface`], [`netdev`], [`clock`] | startup inventory and the driver/time contracts |
//! | [`worker`] | 1 Hz sweep thread (requires the `std` feature) |
//!
//! All configuration (interfaces, routes) is immutable once a [`Router`] is
//! constructed; the ARP cache is the only shared mutable state and lives
//! behind a single mutex.  The crate is `no_std` + `alloc`; the `std` feature
//! adds [`worker`] and [`clock::SystemClock`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod arp;
pub mod clock;
pub mod ethernet;
pub mod icmp;
pub mod iface;
pub mod ipv4;
pub mod neighbor;
pub mod netdev;
pub mod route;
pub mod router;
pub mod types;
#[cfg(feature = "std")]
pub mod worker;

#[cfg(test)]
mod neighbor_tests;
#[cfg(test)]
mod route_tests;

pub use iface::{Interface, InterfaceTable};
pub use netdev::FrameDriver;
pub use route::{RouteEntry, RouteTable};
pub use router::Router;
pub use types::{Ipv4Addr, MacAddr};

use core::time::Duration;

// =============================================================================
// Ethernet
// =============================================================================

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETH_HEADER_LEN: usize = 14;
pub const ETH_ADDR_LEN: usize = 6;

// =============================================================================
// ARP (Ethernet + IPv4 only)
// =============================================================================

pub const ARP_HTYPE_ETHERNET: u16 = 1;
pub const ARP_PTYPE_IPV4: u16 = ETHERTYPE_IPV4;
pub const ARP_HLEN_ETHERNET: u8 = 6;
pub const ARP_PLEN_IPV4: u8 = 4;
pub const ARP_OPER_REQUEST: u16 = 1;
pub const ARP_OPER_REPLY: u16 = 2;
pub const ARP_PACKET_LEN: usize = 28;

// =============================================================================
// IPv4
// =============================================================================

pub const IPV4_HEADER_LEN: usize = 20;

/// TTL stamped on every datagram the router originates (echo replies, ICMP
/// errors).
pub const INIT_TTL: u8 = 64;

// =============================================================================
// ICMP
// =============================================================================

pub const ICMP_TYPE_ECHO_REPLY: u8 = 0;
pub const ICMP_TYPE_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_TYPE_ECHO_REQUEST: u8 = 8;
pub const ICMP_TYPE_TIME_EXCEEDED: u8 = 11;

pub const ICMP_CODE_NET_UNREACHABLE: u8 = 0;
pub const ICMP_CODE_HOST_UNREACHABLE: u8 = 1;
pub const ICMP_CODE_PORT_UNREACHABLE: u8 = 3;

/// Bytes of the offending datagram echoed back in type-3 and type-11
/// messages: the original IP header plus the first 8 payload bytes.
pub const ICMP_ERROR_DATA_LEN: usize = 28;

// =============================================================================
// ARP resolver timing
// =============================================================================

/// Age past which a cache entry is treated as absent.
pub const ARP_ENTRY_TTL: Duration = Duration::from_secs(15);
/// Minimum spacing between retransmissions of one ARP request.
pub const ARP_RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// Transmissions attempted before a request is declared exhausted.
pub const ARP_MAX_TRIES: u32 = 5;
/// Period of the [`worker`] sweep loop.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Internet checksum
// =============================================================================

/// Compute the 16-bit one's-complement Internet checksum over `data`.
///
/// An odd trailing byte is padded with zero on the right.  A buffer whose
/// embedded checksum field is correct sums to `0`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    let mut i = 0usize;
    while i + 1 < data.len() {
        sum = sum.wrapping_add(u16::from_be_bytes([data[i], data[i + 1]]) as u32);
        i += 2;
    }
    if i < data.len() {
        sum = sum.wrapping_add((data[i] as u32) << 8);
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}
