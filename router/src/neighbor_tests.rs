use core::time::Duration;

use crate::iface::IfaceId;
use crate::neighbor::{ArpAction, ArpCache};
use crate::types::{Ipv4Addr, MacAddr};

const IP: Ipv4Addr = Ipv4Addr([10, 1, 0, 1]);
const MAC: MacAddr = MacAddr([2, 0, 0, 0, 0, 0x10]);
const DEV: IfaceId = IfaceId(0);

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn frame(marker: u8) -> Vec<u8> {
    vec![marker; 34]
}

#[test]
fn lookup_honors_entry_ttl() {
    let cache = ArpCache::new();
    assert_eq!(cache.lookup(IP, secs(0)), None);

    cache.insert(IP, MAC, secs(0));
    assert_eq!(cache.lookup(IP, secs(0)), Some(MAC));
    assert_eq!(cache.lookup(IP, secs(14)), Some(MAC));
    // A lookup never refreshes the timestamp, so the entry still ages out.
    assert_eq!(cache.lookup(IP, secs(15)), None);
}

#[test]
fn insert_refreshes_existing_entry() {
    let cache = ArpCache::new();
    cache.insert(IP, MAC, secs(0));
    cache.insert(IP, MAC, secs(10));

    assert_eq!(cache.lookup(IP, secs(20)), Some(MAC));
    assert_eq!(cache.entry_count(), 1);
}

#[test]
fn queue_coalesces_per_destination() {
    let cache = ArpCache::new();

    let first = cache.queue_request(IP, frame(1), DEV, secs(0));
    assert!(matches!(
        first,
        Some(ArpAction::SendRequest { ip, iface }) if ip == IP && iface == DEV
    ));

    assert!(cache.queue_request(IP, frame(2), DEV, secs(0)).is_none());
    assert!(cache.queue_request(IP, frame(3), DEV, secs(0)).is_none());
    assert_eq!(cache.request_count(), 1);
}

#[test]
fn sweep_paces_retransmissions() {
    let cache = ArpCache::new();
    cache.queue_request(IP, frame(1), DEV, secs(0));

    // Not a second old yet.
    assert!(cache.sweep(Duration::from_millis(500)).is_empty());

    let due = cache.sweep(secs(1));
    assert_eq!(due.len(), 1);
    assert!(matches!(due[0], ArpAction::SendRequest { ip, .. } if ip == IP));

    // Just retransmitted; nothing due again until another second passes.
    assert!(cache.sweep(Duration::from_millis(1200)).is_empty());
    assert_eq!(cache.sweep(secs(2)).len(), 1);
}

#[test]
fn sweep_exhausts_after_max_tries() {
    let cache = ArpCache::new();
    cache.queue_request(IP, frame(1), DEV, secs(0));
    cache.queue_request(IP, frame(2), DEV, secs(0));

    // Retransmissions at t=1..4 bring the count to the limit.
    for t in 1..=4 {
        let actions = cache.sweep(secs(t));
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], ArpAction::SendRequest { .. }));
    }

    let actions = cache.sweep(secs(5));
    assert_eq!(actions.len(), 1);
    match &actions[0] {
        ArpAction::Exhausted { ip, queue } => {
            assert_eq!(*ip, IP);
            assert_eq!(queue.len(), 2);
            assert_eq!(queue[0].frame[0], 1);
            assert_eq!(queue[1].frame[0], 2);
        }
        ArpAction::SendRequest { .. } => panic!("expected exhaustion"),
    }
    assert_eq!(cache.request_count(), 0);

    // The record is gone; later sweeps stay quiet.
    assert!(cache.sweep(secs(10)).is_empty());
}

#[test]
fn insert_detaches_pending_record() {
    let cache = ArpCache::new();
    cache.queue_request(IP, frame(7), DEV, secs(0));
    cache.queue_request(IP, frame(8), DEV, secs(0));

    let record = cache.insert(IP, MAC, secs(0)).expect("record detached");
    assert_eq!(record.ip, IP);
    assert_eq!(record.iface, DEV);
    assert_eq!(record.queue.len(), 2);
    assert_eq!(cache.request_count(), 0);

    // No record left to detach on a refresh.
    assert!(cache.insert(IP, MAC, secs(1)).is_none());
}

#[test]
fn sweep_prunes_expired_entries() {
    let cache = ArpCache::new();
    cache.insert(IP, MAC, secs(0));
    assert_eq!(cache.entry_count(), 1);

    cache.sweep(secs(14));
    assert_eq!(cache.entry_count(), 1);

    cache.sweep(secs(15));
    assert_eq!(cache.entry_count(), 0);
}
