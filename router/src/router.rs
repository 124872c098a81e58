//! The router context: ingress dispatch, egress, and the sweep driver.
//!
//! A [`Router`] aggregates everything the data plane needs (the interface
//! inventory, the route table, the ARP resolver, the framing driver, and the
//! clock), constructed once and passed explicitly wherever it is needed.
//! Interfaces and routes never change after construction, so the two
//! concurrent tasks (the ingress task calling [`handle_frame`] and the sweep
//! task calling [`sweep`]) only contend on the ARP cache mutex, and only for
//! in-memory bookkeeping: every `send_frame` happens after the lock is
//! released.
//!
//! [`handle_frame`]: Router::handle_frame
//! [`sweep`]: Router::sweep

use alloc::vec::Vec;
use core::time::Duration;

use log::{debug, warn};

use crate::clock::Clock;
use crate::ethernet::EthernetHeader;
use crate::iface::InterfaceTable;
use crate::ipv4::Ipv4Header;
use crate::neighbor::{ArpAction, ArpCache, RequestRecord};
use crate::netdev::FrameDriver;
use crate::route::{RouteEntry, RouteTable};
use crate::types::{DropReason, EtherType, Ipv4Addr, MacAddr};
use crate::{
    ARP_MAX_TRIES, ETH_HEADER_LEN, ETHERTYPE_IPV4, ICMP_CODE_HOST_UNREACHABLE,
    ICMP_TYPE_DEST_UNREACHABLE, arp, ethernet, icmp, ipv4,
};

/// The immutable router context plus its one mutable aggregate (the ARP
/// cache).  Generic over the framing driver and the time source so tests
/// can substitute both.
pub struct Router<D, C> {
    ifaces: InterfaceTable,
    routes: RouteTable,
    cache: ArpCache,
    driver: D,
    clock: C,
}

impl<D: FrameDriver, C: Clock> Router<D, C> {
    /// Assemble a router.  The tables are fixed from here on.
    pub fn new(ifaces: InterfaceTable, routes: RouteTable, driver: D, clock: C) -> Self {
        Self {
            ifaces,
            routes,
            cache: ArpCache::new(),
            driver,
            clock,
        }
    }

    /// The interface inventory.
    pub fn ifaces(&self) -> &InterfaceTable {
        &self.ifaces
    }

    /// The route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The ARP resolver.
    pub fn cache(&self) -> &ArpCache {
        &self.cache
    }

    pub(crate) fn driver(&self) -> &D {
        &self.driver
    }

    pub(crate) fn now(&self) -> Duration {
        self.clock.now()
    }

    // =========================================================================
    // Ingress
    // =========================================================================

    /// Process one received frame.
    ///
    /// The single entry point for the ingress task.  `frame` is borrowed from
    /// the driver for the duration of this call only; anything that must
    /// outlive it (packets queued for ARP, reply frames) is copied into owned
    /// storage before returning.  Nothing here ever propagates an error back
    /// to the driver.
    pub fn handle_frame(&self, iface_name: &str, frame: &[u8]) {
        debug!("rx: {} byte frame on {}", frame.len(), iface_name);

        let Some(iface) = self.ifaces.by_name(iface_name) else {
            debug!("rx: drop from {}: {}", iface_name, DropReason::UnknownInterface);
            return;
        };

        let (eth, payload) = match EthernetHeader::parse(frame) {
            Ok(parsed) => parsed,
            Err(reason) => {
                debug!("rx: drop on {}: {}", iface.name, reason);
                return;
            }
        };

        match eth.ethertype() {
            Some(EtherType::Arp) => arp::handle_rx(self, iface, payload),
            Some(EtherType::Ipv4) => ipv4::handle_rx(self, iface, frame),
            Some(EtherType::Ipv6) => {
                // Recognized but not routed.
            }
            None => {
                debug!(
                    "rx: unknown ethertype 0x{:04x} on {}, dropping",
                    eth.ethertype, iface.name
                );
            }
        }
    }

    // =========================================================================
    // Sweep (driven by the periodic worker, or directly in tests)
    // =========================================================================

    /// Run one resolver sweep at the current clock reading.
    ///
    /// Collects the due retransmissions and exhaustions under the cache lock,
    /// then performs the I/O lock-free.
    pub fn sweep(&self) {
        let now = self.clock.now();
        for action in self.cache.sweep(now) {
            self.execute(action);
        }
    }

    // =========================================================================
    // Egress
    // =========================================================================

    /// Route `frame` (an owned Ethernet+IPv4 frame) toward `dst` and send it.
    ///
    /// Used for datagrams the router originates; a route miss drops the
    /// frame without further error synthesis.
    pub(crate) fn send_ip(&self, frame: Vec<u8>, dst: Ipv4Addr) {
        let Some(route) = self.routes.lookup(dst) else {
            debug!("tx: no route to {}, dropping", dst);
            return;
        };
        self.send_via_route(frame, route);
    }

    /// Send an owned frame along a chosen route, resolving the next hop.
    ///
    /// The next hop is always `route.gateway`, even for directly connected
    /// routes (inherited behavior, see DESIGN notes).  On a cache hit the
    /// frame leaves immediately; on a miss it is queued on the request
    /// record, and if that record is fresh the first ARP request goes out
    /// right away rather than waiting for the next sweep.
    pub(crate) fn send_via_route(&self, mut frame: Vec<u8>, route: &RouteEntry) {
        let Some(iface) = self.ifaces.get(route.iface) else {
            return;
        };

        ethernet::set_ethertype(&mut frame, ETHERTYPE_IPV4);
        ethernet::set_src_mac(&mut frame, iface.mac);

        let next_hop = route.gateway;
        let now = self.clock.now();
        if let Some(mac) = self.cache.lookup(next_hop, now) {
            ethernet::set_dst_mac(&mut frame, mac);
            self.driver.send_frame(iface, &frame);
        } else if let Some(action) = self.cache.queue_request(next_hop, frame, route.iface, now) {
            self.execute(action);
        }
    }

    /// Flush a resolved request record's queue in arrival order.
    pub(crate) fn flush_pending(&self, record: RequestRecord, mac: MacAddr) {
        debug!(
            "arp: {} resolved to {}, flushing {} queued packets",
            record.ip,
            mac,
            record.queue.len()
        );
        for mut pending in record.queue {
            let Some(iface) = self.ifaces.get(pending.iface) else {
                continue;
            };
            ethernet::set_dst_mac(&mut pending.frame, mac);
            self.driver.send_frame(iface, &pending.frame);
        }
    }

    /// Synthesize and send an ICMP error about `original` back to `dst`.
    ///
    /// The reply is routed by its own destination; a miss drops silently,
    /// errors never beget errors.  `src` is the address the message claims
    /// to come from; `None` picks the egress interface's address (used by
    /// sweep-originated host-unreachables, which have no receiving
    /// interface).
    pub(crate) fn send_icmp_error(
        &self,
        icmp_type: u8,
        code: u8,
        src: Option<Ipv4Addr>,
        dst: Ipv4Addr,
        original: &[u8],
    ) {
        let Some(route) = self.routes.lookup(dst) else {
            debug!("icmp: no route for error to {}, dropping", dst);
            return;
        };
        let src = match src {
            Some(ip) => ip,
            None => match self.ifaces.get(route.iface) {
                Some(iface) => iface.addr,
                None => return,
            },
        };
        let frame = icmp::build_error(icmp_type, code, src, dst, original);
        self.send_via_route(frame, route);
    }

    /// Execute one deferred resolver action.  The cache lock is not held.
    fn execute(&self, action: ArpAction) {
        match action {
            ArpAction::SendRequest { ip, iface } => {
                let Some(iface) = self.ifaces.get(iface) else {
                    return;
                };
                debug!("arp: requesting {} on {}", ip, iface.name);
                self.driver.send_frame(iface, &arp::build_request(iface, ip));
            }
            ArpAction::Exhausted { ip, queue } => {
                warn!(
                    "arp: {}: {} after {} tries, answering {} queued packets",
                    ip,
                    DropReason::ArpExhausted,
                    ARP_MAX_TRIES,
                    queue.len()
                );
                for pending in queue {
                    self.unreachable_reply(&pending.frame);
                }
            }
        }
    }

    /// ICMP host-unreachable aimed at the source of a queued frame whose
    /// next hop never resolved.
    fn unreachable_reply(&self, frame: &[u8]) {
        if frame.len() < ETH_HEADER_LEN {
            return;
        }
        let datagram = &frame[ETH_HEADER_LEN..];
        let Ok((header, _payload)) = Ipv4Header::parse(datagram) else {
            return;
        };
        self.send_icmp_error(
            ICMP_TYPE_DEST_UNREACHABLE,
            ICMP_CODE_HOST_UNREACHABLE,
            None,
            header.src,
            &datagram[..header.total_len],
        );
    }
}
