use crate::iface::{IfaceId, InterfaceTable};
use crate::route::{ConfigError, RouteEntry, RouteTable};
use crate::types::{Ipv4Addr, MacAddr};

fn two_ifaces() -> InterfaceTable {
    let mut ifaces = InterfaceTable::new();
    ifaces.add("eth0", MacAddr([2, 0, 0, 0, 0, 1]), Ipv4Addr([10, 0, 1, 2]));
    ifaces.add("eth1", MacAddr([2, 0, 0, 0, 0, 2]), Ipv4Addr([172, 64, 3, 1]));
    ifaces
}

fn entry(dest: [u8; 4], mask: [u8; 4], gateway: [u8; 4], iface: usize) -> RouteEntry {
    RouteEntry {
        dest: Ipv4Addr(dest),
        mask: Ipv4Addr(mask),
        gateway: Ipv4Addr(gateway),
        iface: IfaceId(iface),
    }
}

#[test]
fn lookup_prefers_longest_prefix() {
    let mut table = RouteTable::new();
    table.add(entry([0, 0, 0, 0], [0, 0, 0, 0], [10, 0, 1, 1], 0));
    table.add(entry(
        [192, 168, 2, 0],
        [255, 255, 255, 0],
        [172, 64, 3, 10],
        1,
    ));
    table.add(entry(
        [192, 168, 2, 64],
        [255, 255, 255, 192],
        [172, 64, 3, 20],
        1,
    ));

    let via = |ip: [u8; 4]| table.lookup(Ipv4Addr(ip)).map(|r| r.gateway);
    assert_eq!(via([192, 168, 2, 70]), Some(Ipv4Addr([172, 64, 3, 20])));
    assert_eq!(via([192, 168, 2, 5]), Some(Ipv4Addr([172, 64, 3, 10])));
    assert_eq!(via([8, 8, 8, 8]), Some(Ipv4Addr([10, 0, 1, 1])));
}

#[test]
fn lookup_host_route_beats_subnet() {
    let mut table = RouteTable::new();
    table.add(entry(
        [192, 168, 2, 0],
        [255, 255, 255, 0],
        [172, 64, 3, 10],
        1,
    ));
    table.add(entry(
        [192, 168, 2, 9],
        [255, 255, 255, 255],
        [172, 64, 3, 99],
        1,
    ));

    let hit = table.lookup(Ipv4Addr([192, 168, 2, 9])).unwrap();
    assert_eq!(hit.gateway, Ipv4Addr([172, 64, 3, 99]));
    assert_eq!(hit.prefix_len(), 32);
}

#[test]
fn lookup_tie_takes_first_added() {
    let mut table = RouteTable::new();
    table.add(entry([10, 9, 0, 0], [255, 255, 0, 0], [10, 0, 1, 1], 0));
    table.add(entry([10, 9, 0, 0], [255, 255, 0, 0], [10, 0, 1, 2], 1));

    let hit = table.lookup(Ipv4Addr([10, 9, 3, 4])).unwrap();
    assert_eq!(hit.gateway, Ipv4Addr([10, 0, 1, 1]));
    assert_eq!(hit.iface, IfaceId(0));
}

#[test]
fn lookup_miss_without_default() {
    let mut table = RouteTable::new();
    table.add(entry(
        [192, 168, 2, 0],
        [255, 255, 255, 0],
        [172, 64, 3, 10],
        1,
    ));
    assert!(table.lookup(Ipv4Addr([172, 16, 0, 1])).is_none());
}

#[test]
fn add_normalizes_destination() {
    let mut table = RouteTable::new();
    table.add(entry(
        [192, 168, 2, 77],
        [255, 255, 255, 0],
        [172, 64, 3, 10],
        1,
    ));

    let stored = table.iter().next().unwrap();
    assert_eq!(stored.dest, Ipv4Addr([192, 168, 2, 0]));
    assert!(table.lookup(Ipv4Addr([192, 168, 2, 5])).is_some());
}

#[test]
fn parse_route_file() {
    let ifaces = two_ifaces();
    let text = "\
# static routes
0.0.0.0        10.0.1.1      0.0.0.0          eth0

192.168.2.0    172.64.3.10   255.255.255.0    eth1   # server net
";
    let table = RouteTable::parse(text, &ifaces).unwrap();
    assert_eq!(table.len(), 2);

    let default = table.lookup(Ipv4Addr([8, 8, 8, 8])).unwrap();
    assert_eq!(default.gateway, Ipv4Addr([10, 0, 1, 1]));
    assert_eq!(default.iface, IfaceId(0));

    let server = table.lookup(Ipv4Addr([192, 168, 2, 40])).unwrap();
    assert_eq!(server.gateway, Ipv4Addr([172, 64, 3, 10]));
    assert_eq!(server.iface, IfaceId(1));
}

#[test]
fn parse_rejects_bad_lines() {
    let ifaces = two_ifaces();

    assert_eq!(
        RouteTable::parse("0.0.0.0 10.0.1.1 0.0.0.0\n", &ifaces).unwrap_err(),
        ConfigError::BadColumns { line: 1 }
    );
    assert_eq!(
        RouteTable::parse("\n0.0.0.0 10.0.1.1 0.0.0.0 eth0 extra\n", &ifaces).unwrap_err(),
        ConfigError::BadColumns { line: 2 }
    );
    assert_eq!(
        RouteTable::parse("0.0.0.256 10.0.1.1 0.0.0.0 eth0\n", &ifaces).unwrap_err(),
        ConfigError::BadAddress { line: 1 }
    );
    assert_eq!(
        RouteTable::parse("0.0.0.0 10.0.1.1 0.0.0.0 wlan9\n", &ifaces).unwrap_err(),
        ConfigError::UnknownInterface { line: 1 }
    );
}

#[test]
fn dotted_quad_parsing() {
    assert_eq!(Ipv4Addr::parse("10.0.0.1"), Some(Ipv4Addr([10, 0, 0, 1])));
    assert_eq!(
        Ipv4Addr::parse("255.255.255.255"),
        Some(Ipv4Addr([255, 255, 255, 255]))
    );
    assert_eq!(Ipv4Addr::parse("10.0.0"), None);
    assert_eq!(Ipv4Addr::parse("10.0.0.0.1"), None);
    assert_eq!(Ipv4Addr::parse("10.0.0.x"), None);
    assert_eq!(Ipv4Addr::parse(""), None);
}
