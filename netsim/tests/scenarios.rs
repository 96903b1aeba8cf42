//! Whole-simulation scenarios driven through the public API.
//!
//! Deterministic runs: fixed seed, `error_prob = 0`, `signal_time = 10`.

use netsim::bits;
use netsim::device::{Device, Node};
use netsim::instruction::{Instruction, Op};
use netsim::link::MacAddr;
use netsim::net::{IpAddress, Route};
use netsim::{ErrorDetection, SimConfig, Simulation};

fn config() -> SimConfig {
    SimConfig {
        signal_time: 10,
        error_detection: ErrorDetection::SimpleHash,
        error_prob: 0.0,
        seed: 7,
    }
}

fn run(instructions: Vec<Instruction>) -> Simulation {
    let mut sim = Simulation::new(config());
    sim.run(instructions).unwrap();
    sim
}

fn inst(time: u64, op: Op) -> Instruction {
    Instruction::new(time, op)
}

fn ip(text: &str) -> IpAddress {
    IpAddress::parse(text).unwrap()
}

fn node<'a>(sim: &'a Simulation, name: &str) -> &'a Node {
    sim.device(name).and_then(Device::as_node).unwrap()
}

fn create_host(name: &str) -> Op {
    Op::CreateHost {
        name: name.to_string(),
    }
}

fn set_mac(device: &str, interface: usize, mac: u16) -> Op {
    Op::SetMac {
        device: device.to_string(),
        interface,
        mac: MacAddr(mac),
    }
}

fn set_ip(device: &str, interface: usize, addr: &str, mask: &str) -> Op {
    Op::SetIp {
        device: device.to_string(),
        interface,
        ip: ip(addr),
        mask: ip(mask),
    }
}

fn connect(port_a: &str, port_b: &str) -> Op {
    Op::Connect {
        port_a: port_a.to_string(),
        port_b: port_b.to_string(),
    }
}

fn send_frame(device: &str, dest: u16, payload: u16) -> Op {
    Op::SendFrame {
        device: device.to_string(),
        dest: MacAddr(dest),
        data: bits::bits_from_int(u64::from(payload), 16),
    }
}

fn add_route(device: &str, dest: &str, mask: &str, gateway: &str, interface: usize) -> Op {
    Op::RouteAdd {
        device: device.to_string(),
        route: Route::new(ip(dest), ip(mask), ip(gateway), interface),
    }
}

fn ping(device: &str, dest: &str) -> Op {
    Op::Ping {
        device: device.to_string(),
        dest: ip(dest),
    }
}

#[test]
fn frame_crosses_a_cable() {
    let sim = run(vec![
        inst(0, create_host("H1")),
        inst(0, create_host("H2")),
        inst(0, set_mac("H1", 1, 0x0001)),
        inst(0, set_mac("H2", 1, 0x0002)),
        inst(10, connect("H1_1", "H2_1")),
        inst(20, send_frame("H1", 0x0002, 0xABCD)),
    ]);

    let rows = node(&sim, "H2").received_data();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, MacAddr(0x0001));
    assert_eq!(rows[0].payload_hex, "ABCD");
    assert!(!rows[0].error);
}

#[test]
fn switch_floods_unknown_and_unicasts_learned_destinations() {
    let sim = run(vec![
        inst(0, create_host("H1")),
        inst(0, create_host("H2")),
        inst(0, create_host("H3")),
        inst(
            0,
            Op::CreateSwitch {
                name: "S".to_string(),
                ports: 3,
            },
        ),
        inst(0, set_mac("H1", 1, 0x0001)),
        inst(0, set_mac("H2", 1, 0x0002)),
        inst(0, set_mac("H3", 1, 0x0003)),
        inst(10, connect("H1_1", "S_1")),
        inst(10, connect("H2_1", "S_2")),
        inst(10, connect("H3_1", "S_3")),
        // Destination not learned yet: flooded to H2 and H3.
        inst(20, send_frame("H1", 0x0002, 0x00AA)),
        // H1 was learned from the first frame: delivered to H1 only.
        inst(400, send_frame("H2", 0x0001, 0x00BB)),
    ]);

    let h1 = node(&sim, "H1").received_data();
    let h2 = node(&sim, "H2").received_data();
    let h3 = node(&sim, "H3").received_data();

    assert_eq!(h2.len(), 1);
    assert_eq!(h2[0].source, MacAddr(0x0001));
    assert_eq!(h2[0].payload_hex, "00AA");
    assert!(!h2[0].error);

    assert_eq!(h3.len(), 1);
    assert_eq!(h3[0].source, MacAddr(0x0001));
    assert_eq!(h3[0].payload_hex, "00AA");

    assert_eq!(h1.len(), 1);
    assert_eq!(h1[0].source, MacAddr(0x0002));
    assert_eq!(h1[0].payload_hex, "00BB");
    assert!(!h1[0].error);
}

#[test]
fn arp_resolution_and_ping_round_trip() {
    let sim = run(vec![
        inst(0, create_host("A")),
        inst(0, create_host("B")),
        inst(0, set_mac("A", 1, 0x0001)),
        inst(0, set_mac("B", 1, 0x0002)),
        inst(0, set_ip("A", 1, "10.0.0.1", "255.255.255.0")),
        inst(0, set_ip("B", 1, "10.0.0.2", "255.255.255.0")),
        inst(10, connect("A_1", "B_1")),
        // The `ping` script instruction expands to four echo requests.
        inst(20, ping("A", "10.0.0.2")),
        inst(120, ping("A", "10.0.0.2")),
        inst(220, ping("A", "10.0.0.2")),
        inst(320, ping("A", "10.0.0.2")),
    ]);

    let replies = node(&sim, "A").received_payload();
    assert_eq!(replies.len(), 4);
    for row in replies {
        assert_eq!(row.source, ip("10.0.0.2"));
        assert_eq!(row.message, "echo reply");
    }

    let requests = node(&sim, "B").received_payload();
    assert_eq!(requests.len(), 4);
    for row in requests {
        assert_eq!(row.source, ip("10.0.0.1"));
        assert_eq!(row.message, "echo request");
    }
}

#[test]
fn router_forwards_between_subnets() {
    let sim = run(vec![
        inst(0, create_host("H1")),
        inst(0, create_host("H2")),
        inst(
            0,
            Op::CreateRouter {
                name: "R".to_string(),
                ports: 2,
            },
        ),
        inst(0, set_mac("H1", 1, 0x0001)),
        inst(0, set_mac("H2", 1, 0x0002)),
        inst(0, set_mac("R", 1, 0x00AA)),
        inst(0, set_mac("R", 2, 0x00BB)),
        inst(0, set_ip("H1", 1, "10.0.1.2", "255.255.255.0")),
        inst(0, set_ip("H2", 1, "10.0.2.2", "255.255.255.0")),
        inst(0, set_ip("R", 1, "10.0.1.1", "255.255.255.0")),
        inst(0, set_ip("R", 2, "10.0.2.1", "255.255.255.0")),
        inst(10, connect("H1_1", "R_1")),
        inst(10, connect("H2_1", "R_2")),
        inst(15, add_route("H1", "0.0.0.0", "0.0.0.0", "10.0.1.1", 1)),
        inst(15, add_route("H2", "0.0.0.0", "0.0.0.0", "10.0.2.1", 1)),
        inst(15, add_route("R", "10.0.1.0", "255.255.255.0", "0.0.0.0", 1)),
        inst(15, add_route("R", "10.0.2.0", "255.255.255.0", "0.0.0.0", 2)),
        inst(20, ping("H1", "10.0.2.2")),
    ]);

    let replies = node(&sim, "H1").received_payload();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].source, ip("10.0.2.2"));
    assert_eq!(replies[0].message, "echo reply");

    let requests = node(&sim, "H2").received_payload();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].source, ip("10.0.1.2"));
    assert_eq!(requests[0].message, "echo request");
}

#[test]
fn simultaneous_senders_collide_and_both_frames_survive() {
    let sim = run(vec![
        inst(0, create_host("H1")),
        inst(0, create_host("H2")),
        inst(
            0,
            Op::CreateHub {
                name: "HUB".to_string(),
                ports: 3,
            },
        ),
        inst(0, set_mac("H1", 1, 0x0001)),
        inst(0, set_mac("H2", 1, 0x0002)),
        inst(10, connect("H1_1", "HUB_1")),
        inst(10, connect("H2_1", "HUB_2")),
        inst(20, send_frame("H1", 0x0002, 0x00AA)),
        inst(20, send_frame("H2", 0x0001, 0x00BB)),
    ]);

    for name in ["H1", "H2"] {
        let events = node(&sim, name).base.events.rows();
        assert!(
            events.iter().any(|row| row.contains("Collision")),
            "{name} never detected the collision"
        );
    }

    let h1 = node(&sim, "H1").received_data();
    let h2 = node(&sim, "H2").received_data();
    assert_eq!(h1.len(), 1);
    assert_eq!(h1[0].source, MacAddr(0x0002));
    assert_eq!(h1[0].payload_hex, "00BB");
    assert!(!h1[0].error);
    assert_eq!(h2.len(), 1);
    assert_eq!(h2[0].source, MacAddr(0x0001));
    assert_eq!(h2[0].payload_hex, "00AA");
    assert!(!h2[0].error);
}

#[test]
fn unroutable_destination_comes_back_unreachable() {
    let sim = run(vec![
        inst(0, create_host("H")),
        inst(
            0,
            Op::CreateRouter {
                name: "R".to_string(),
                ports: 2,
            },
        ),
        inst(0, set_mac("H", 1, 0x0001)),
        inst(0, set_mac("R", 1, 0x00AA)),
        inst(0, set_ip("H", 1, "10.0.1.2", "255.255.255.0")),
        inst(0, set_ip("R", 1, "10.0.1.1", "255.255.255.0")),
        inst(10, connect("H_1", "R_1")),
        inst(15, add_route("H", "0.0.0.0", "0.0.0.0", "10.0.1.1", 1)),
        inst(
            20,
            Op::SendPacket {
                device: "H".to_string(),
                dest: ip("99.9.9.9"),
                data: bits::bits_from_int(0xBEEF, 16),
            },
        ),
    ]);

    let rows = node(&sim, "H").received_payload();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source, ip("10.0.1.1"));
    assert_eq!(rows[0].message, "destination host unreachable");
}
