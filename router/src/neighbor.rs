//! ARP cache and request resolver.
//!
//! Maps next-hop IPv4 addresses to MAC addresses with a 15-second entry
//! lifetime, and runs the request side of ARP: packets whose next hop is
//! unresolved are queued on a per-address request record (one record per
//! address, however many packets pile up), the request is retransmitted at
//! 1-second intervals by the sweep, and after [`ARP_MAX_TRIES`] unanswered
//! transmissions the record is destroyed and every queued packet is handed
//! back for ICMP host-unreachable synthesis.
//!
//! # Concurrency
//!
//! Both maps live behind one [`spin::Mutex`]; every public operation
//! acquires it, does only in-memory work, and releases it before any frame
//! leaves the box.  Operations that need to transmit return [`ArpAction`]s
//! the caller executes *after* the lock is gone, so outbound I/O never
//! serializes under the cache mutex and the driver can block freely.
//!
//! # Expiry
//!
//! Entry aging is lazy: [`lookup`](ArpCache::lookup) filters by age and a
//! hit never refreshes the timestamp.  The sweep additionally prunes expired
//! entries, which is observationally the same and keeps the map bounded.

use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

use spin::Mutex;

use crate::iface::IfaceId;
use crate::types::{Ipv4Addr, MacAddr};
use crate::{ARP_ENTRY_TTL, ARP_MAX_TRIES, ARP_RETRY_INTERVAL};

// =============================================================================
// Records
// =============================================================================

/// A resolved mapping.
struct CacheEntry {
    ip: Ipv4Addr,
    mac: MacAddr,
    inserted_at: Duration,
}

impl CacheEntry {
    fn expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.inserted_at) >= ARP_ENTRY_TTL
    }
}

/// A frame waiting for its next hop to resolve.
///
/// Owns a full copy of the Ethernet frame; the destination MAC inside it is
/// patched at flush time.  Created on queue, destroyed on flush or
/// exhaustion, with one owner for the whole lifetime.
pub struct PendingPacket {
    pub frame: Vec<u8>,
    pub iface: IfaceId,
}

/// An in-flight ARP request with its queue of waiting packets.
///
/// At most one record exists per target address; later packets for the same
/// address join the queue instead of spawning new requests.
pub struct RequestRecord {
    pub ip: Ipv4Addr,
    /// Interface of the first queued packet; requests go out here.
    pub iface: IfaceId,
    pub sent_count: u32,
    pub last_sent_at: Duration,
    /// Waiting packets in arrival order; flushed FIFO on resolution.
    pub queue: Vec<PendingPacket>,
}

/// Deferred I/O collected under the cache lock, executed after release.
pub enum ArpAction {
    /// Broadcast an ARP request for `ip` on `iface`.
    SendRequest { ip: Ipv4Addr, iface: IfaceId },
    /// A request ran out of tries; answer each queued packet's source with
    /// ICMP host-unreachable.
    Exhausted {
        ip: Ipv4Addr,
        queue: Vec<PendingPacket>,
    },
}

// =============================================================================
// ArpCache
// =============================================================================

struct ArpCacheInner {
    entries: Vec<CacheEntry>,
    requests: Vec<RequestRecord>,
}

/// The resolver: cache entries plus request records behind a single mutex.
pub struct ArpCache {
    inner: Mutex<ArpCacheInner>,
}

impl ArpCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(ArpCacheInner {
                entries: Vec::new(),
                requests: Vec::new(),
            }),
        }
    }

    /// Look up a non-expired mapping.  A hit does not refresh the entry.
    pub fn lookup(&self, ip: Ipv4Addr, now: Duration) -> Option<MacAddr> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .find(|e| e.ip == ip && !e.expired(now))
            .map(|e| e.mac)
    }

    /// Install or refresh a mapping.
    ///
    /// If a request record for `ip` was pending, it is detached from the
    /// request map and returned so the caller can flush its queue with the
    /// newly learned MAC (outside the lock).
    pub fn insert(&self, ip: Ipv4Addr, mac: MacAddr, now: Duration) -> Option<RequestRecord> {
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.entries.iter_mut().find(|e| e.ip == ip) {
            entry.mac = mac;
            entry.inserted_at = now;
        } else {
            inner.entries.push(CacheEntry {
                ip,
                mac,
                inserted_at: now,
            });
        }

        let pos = inner.requests.iter().position(|r| r.ip == ip)?;
        Some(inner.requests.swap_remove(pos))
    }

    /// Queue a packet behind the (possibly new) request for `ip`.
    ///
    /// An existing record absorbs the packet and nothing is transmitted;
    /// the sweep paces retransmissions.  A fresh record counts the request
    /// the caller is about to send (`sent_count = 1`, `last_sent_at = now`)
    /// and returns the send action for the caller to execute off-lock.
    pub fn queue_request(
        &self,
        ip: Ipv4Addr,
        frame: Vec<u8>,
        iface: IfaceId,
        now: Duration,
    ) -> Option<ArpAction> {
        let mut inner = self.inner.lock();

        if let Some(record) = inner.requests.iter_mut().find(|r| r.ip == ip) {
            record.queue.push(PendingPacket { frame, iface });
            return None;
        }

        inner.requests.push(RequestRecord {
            ip,
            iface,
            sent_count: 1,
            last_sent_at: now,
            queue: vec![PendingPacket { frame, iface }],
        });
        Some(ArpAction::SendRequest { ip, iface })
    }

    /// Advance the timeout state machine; called once per second.
    ///
    /// For each request record due for attention (nothing has been sent for
    /// [`ARP_RETRY_INTERVAL`]): retransmit while tries remain, otherwise
    /// detach the record and surface its queue as [`ArpAction::Exhausted`].
    /// Expired cache entries are pruned on the way.
    ///
    /// Only bookkeeping happens under the lock; the returned actions carry
    /// all the I/O.
    pub fn sweep(&self, now: Duration) -> Vec<ArpAction> {
        let mut actions = Vec::new();
        let mut inner = self.inner.lock();

        inner.entries.retain(|e| !e.expired(now));

        let mut i = 0;
        while i < inner.requests.len() {
            let record = &mut inner.requests[i];

            if now.saturating_sub(record.last_sent_at) < ARP_RETRY_INTERVAL {
                i += 1;
                continue;
            }

            if record.sent_count >= ARP_MAX_TRIES {
                let record = inner.requests.swap_remove(i);
                actions.push(ArpAction::Exhausted {
                    ip: record.ip,
                    queue: record.queue,
                });
            } else {
                record.sent_count += 1;
                record.last_sent_at = now;
                actions.push(ArpAction::SendRequest {
                    ip: record.ip,
                    iface: record.iface,
                });
                i += 1;
            }
        }

        actions
    }

    /// Number of (possibly expired) cache entries.  Diagnostic.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Number of outstanding request records.  Diagnostic.
    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }
}

impl Default for ArpCache {
    fn default() -> Self {
        Self::new()
    }
}
