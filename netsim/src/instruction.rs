//! Scheduled instructions, the engine's input.
//!
//! The script parser produces a time-sorted list of these; the engine
//! executes everything scheduled for the current tick before the devices
//! update.

use core::fmt;

use crate::bits::Bit;
use crate::link::MacAddr;
use crate::net::{IpAddress, Route};

/// One scheduled operation.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Instruction {
    /// Simulation time, in milliseconds, at which the operation runs.
    pub time: u64,
    pub op: Op,
}

impl Instruction {
    pub fn new(time: u64, op: Op) -> Instruction {
        Instruction { time, op }
    }
}

/// The operation kinds a script can schedule.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Op {
    CreateHost { name: String },
    CreateHub { name: String, ports: usize },
    CreateSwitch { name: String, ports: usize },
    CreateRouter { name: String, ports: usize },
    Connect { port_a: String, port_b: String },
    Disconnect { port: String },
    SetMac { device: String, interface: usize, mac: MacAddr },
    SetIp { device: String, interface: usize, ip: IpAddress, mask: IpAddress },
    /// Push raw bits to a node's physical layer.
    Send { device: String, data: Vec<Bit> },
    /// Build and send one frame from a node's first port.
    SendFrame { device: String, dest: MacAddr, data: Vec<Bit> },
    /// Originate an IP packet, routed through the node's table.
    SendPacket { device: String, dest: IpAddress, data: Vec<Bit> },
    /// One echo request toward `dest`.
    Ping { device: String, dest: IpAddress },
    RouteReset { device: String },
    RouteAdd { device: String, route: Route },
    RouteRemove { device: String, route: Route },
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::CreateHost { name } => write!(f, "create host {name}"),
            Op::CreateHub { name, ports } => write!(f, "create hub {name} {ports}"),
            Op::CreateSwitch { name, ports } => write!(f, "create switch {name} {ports}"),
            Op::CreateRouter { name, ports } => write!(f, "create router {name} {ports}"),
            Op::Connect { port_a, port_b } => write!(f, "connect {port_a} {port_b}"),
            Op::Disconnect { port } => write!(f, "disconnect {port}"),
            Op::SetMac { device, interface, mac } => {
                write!(f, "mac {device}:{interface} {mac}")
            }
            Op::SetIp { device, interface, ip, mask } => {
                write!(f, "ip {device}:{interface} {ip} {mask}")
            }
            Op::Send { device, data } => write!(f, "send {device} ({} bits)", data.len()),
            Op::SendFrame { device, dest, .. } => write!(f, "send_frame {device} {dest}"),
            Op::SendPacket { device, dest, .. } => write!(f, "send_packet {device} {dest}"),
            Op::Ping { device, dest } => write!(f, "ping {device} {dest}"),
            Op::RouteReset { device } => write!(f, "route reset {device}"),
            Op::RouteAdd { device, route } => write!(f, "route add {device} {route}"),
            Op::RouteRemove { device, route } => write!(f, "route remove {device} {route}"),
        }
    }
}
