//! Hosts and routers: the network layer on top of the port machinery.
//!
//! Both kinds share everything up to IP handling: per-port MAC/IP
//! assignment, ARP resolution with a pending-packet queue, and a routing
//! table with longest-prefix match. They differ in what happens to a
//! delivered packet: a host consumes packets addressed to itself (answering
//! echo requests), a router forwards and answers unroutable packets with an
//! ICMP destination-host-unreachable.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::bits::{self, Bit};
use crate::device::port_device::PortBase;
use crate::device::TickCtx;
use crate::link::{frame_has_errors, Frame, MacAddr};
use crate::net::{icmp_payload_message, IpAddress, IpPacket, Route, RouteTable, ICMP_ECHO_REQUEST};

/// What a node does with packets that reach it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeRole {
    Host,
    Router,
}

/// One `<name>_data.txt` row: an intact or corrupt frame delivery.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DataRow {
    pub time: u64,
    pub source: MacAddr,
    pub payload_hex: String,
    pub error: bool,
}

/// One `<name>_payload.txt` row: an IP-level delivery.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PayloadRow {
    pub time: u64,
    pub source: IpAddress,
    pub message: String,
}

/// A host or router.
pub struct Node {
    pub base: PortBase,
    pub role: NodeRole,
    macs: Vec<Option<MacAddr>>,
    ips: Vec<Option<IpAddress>>,
    masks: Vec<Option<IpAddress>>,
    /// Resolved IP (raw form) to MAC mappings.
    ip_table: BTreeMap<u32, MacAddr>,
    /// Packet bits parked until the keyed IP resolves.
    waiting_arp: BTreeMap<u32, Vec<Vec<Bit>>>,
    routes: RouteTable,
    /// Connected route per interface, replaced when the IP is reassigned.
    connected: BTreeMap<usize, Route>,
    received_data: Vec<DataRow>,
    received_payload: Vec<PayloadRow>,
}

impl Node {
    pub fn new(
        name: &str,
        index: usize,
        role: NodeRole,
        port_count: usize,
        signal_time: u32,
    ) -> Node {
        Node {
            base: PortBase::new(name, index, port_count, signal_time),
            role,
            macs: vec![None; port_count],
            ips: vec![None; port_count],
            masks: vec![None; port_count],
            ip_table: BTreeMap::new(),
            waiting_arp: BTreeMap::new(),
            routes: RouteTable::new(),
            connected: BTreeMap::new(),
            received_data: Vec::new(),
            received_payload: Vec::new(),
        }
    }

    pub fn port_count(&self) -> usize {
        self.base.ports.len()
    }

    /// Assign a MAC to a 1-based interface.
    pub fn set_mac(&mut self, interface: usize, mac: MacAddr, time: u64) {
        self.macs[interface - 1] = Some(mac);
        self.base
            .events
            .push(time, "MAC", &format!("{} {mac}", self.base.ports[interface - 1].name));
    }

    /// Assign an IP and mask to a 1-based interface.
    ///
    /// Installs the connected route for the interface's subnet so on-link
    /// destinations resolve without explicit `route add` lines.
    pub fn set_ip(&mut self, interface: usize, ip: IpAddress, mask: IpAddress, time: u64) {
        self.ips[interface - 1] = Some(ip);
        self.masks[interface - 1] = Some(mask);

        let subnet = IpAddress::from_raw(ip.raw() & mask.raw());
        let route = Route::new(subnet, mask, IpAddress::UNSPECIFIED, interface);
        if let Some(old) = self.connected.insert(interface, route) {
            self.routes.remove(&old);
        }
        self.routes.add(route);
        self.base
            .events
            .push(time, "IP", &format!("{} {ip} {mask}", self.base.ports[interface - 1].name));
    }

    pub fn mac(&self, interface: usize) -> Option<MacAddr> {
        self.macs.get(interface - 1).copied().flatten()
    }

    pub fn ip(&self, interface: usize) -> Option<IpAddress> {
        self.ips.get(interface - 1).copied().flatten()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.add(route);
    }

    pub fn remove_route(&mut self, route: &Route) {
        self.routes.remove(route);
    }

    pub fn reset_routes(&mut self) {
        self.routes.reset();
        self.connected.clear();
    }

    pub fn received_data(&self) -> &[DataRow] {
        &self.received_data
    }

    pub fn received_payload(&self) -> &[PayloadRow] {
        &self.received_payload
    }

    /// Queue raw bits on the first port, bypassing the frame machinery.
    pub fn send_raw(&mut self, data: Vec<Bit>) {
        self.base.phys[0].send(vec![data]);
    }

    pub fn update(&mut self, ctx: &mut TickCtx<'_>) {
        let log_bits = self.role == NodeRole::Host;
        for port in 0..self.base.ports.len() {
            if let Some(frame) = self.base.tick_port(port, ctx, log_bits) {
                self.on_frame(frame, port, ctx);
            }
        }
    }

    /// Build and queue one frame on a 0-based port.
    pub fn send_frame(
        &mut self,
        dest: MacAddr,
        payload: Vec<Bit>,
        port: usize,
        ctx: &mut TickCtx<'_>,
    ) {
        let Some(src) = self.macs[port] else {
            warn!(
                target: "net",
                "{}: no MAC on {}, dropping frame to {dest}",
                self.base.name, self.base.ports[port].name
            );
            self.base
                .events
                .push(ctx.time, "Drop", &format!("No MAC to send to {dest}"));
            return;
        };
        let frame = Frame::build(
            dest,
            src,
            payload,
            ctx.cfg.error_detection,
            ctx.cfg.error_prob,
            ctx.rng,
        );
        debug!(target: "net", "{} port {}: send {frame}", self.base.name, port + 1);
        self.base.events.push(ctx.time, "Send", &frame.to_string());
        self.base.phys[port].send(vec![frame.bits]);
    }

    /// Send an IP packet out of a port toward `next_hop`.
    ///
    /// An unresolved next hop parks the packet and broadcasts an ARP query;
    /// the reply flushes everything parked under that address.
    fn send_toward(
        &mut self,
        port: usize,
        next_hop: IpAddress,
        packet_bits: Vec<Bit>,
        ctx: &mut TickCtx<'_>,
    ) {
        match self.ip_table.get(&next_hop.raw()) {
            Some(&mac) => self.send_frame(mac, packet_bits, port, ctx),
            None => {
                self.waiting_arp
                    .entry(next_hop.raw())
                    .or_default()
                    .push(packet_bits);
                self.send_arp_query(next_hop, port, ctx);
            }
        }
    }

    fn send_arp_query(&mut self, ip: IpAddress, port: usize, ctx: &mut TickCtx<'_>) {
        let mut payload = bits::ascii_to_bits("ARPQ");
        payload.extend(ip.bits());
        self.send_frame(MacAddr::BROADCAST, payload, port, ctx);
    }

    fn send_arp_reply(&mut self, dest: MacAddr, port: usize, ctx: &mut TickCtx<'_>) {
        let Some(local) = self.ips[port] else {
            return;
        };
        let mut payload = bits::ascii_to_bits("ARPQ");
        payload.extend(local.bits());
        self.send_frame(dest, payload, port, ctx);
    }

    /// Route a packet: longest-prefix lookup, then transmit or reject.
    ///
    /// `ingress` carries the receiving port and frame source for forwarded
    /// packets; locally originated packets have none.
    pub fn enroute(
        &mut self,
        packet: IpPacket,
        ingress: Option<(usize, MacAddr)>,
        ctx: &mut TickCtx<'_>,
    ) {
        let route = self.routes.lookup(packet.dest).copied();
        match route {
            Some(route) => {
                let next_hop = if route.gateway.raw() == 0 {
                    packet.dest
                } else {
                    route.gateway
                };
                self.send_toward(route.interface - 1, next_hop, packet.bit_data(), ctx);
            }
            None => match ingress {
                Some((port, src_mac)) if self.role == NodeRole::Router => {
                    // Tell the sender its destination does not exist.
                    let Some(local) = self.ips[port] else {
                        return;
                    };
                    debug!(
                        target: "net",
                        "{}: no route to {}, answering unreachable",
                        self.base.name, packet.dest
                    );
                    let reply = IpPacket::dest_unreachable(packet.src, local);
                    self.send_frame(src_mac, reply.bit_data(), port, ctx);
                }
                _ => {
                    warn!(target: "net", "{}: no route to {}", self.base.name, packet.dest);
                    self.base
                        .events
                        .push(ctx.time, "Drop", &format!("No route to {}", packet.dest));
                }
            },
        }
    }

    /// Instruction entry point: originate a packet from this node.
    pub fn send_packet(&mut self, packet: IpPacket, ctx: &mut TickCtx<'_>) {
        self.enroute(packet, None, ctx);
    }

    /// Instruction entry point: one echo request from the first interface.
    pub fn send_ping(&mut self, dest: IpAddress, ctx: &mut TickCtx<'_>) {
        let Some(local) = self.ips[0] else {
            warn!(target: "net", "{}: no IP assigned, cannot ping {dest}", self.base.name);
            self.base
                .events
                .push(ctx.time, "Drop", &format!("No IP to ping {dest}"));
            return;
        };
        self.send_packet(IpPacket::echo_request(dest, local), ctx);
    }

    fn on_frame(&mut self, frame: Frame, port: usize, ctx: &mut TickCtx<'_>) {
        debug!(target: "net", "{} port {}: received {frame}", self.base.name, port + 1);
        let corrupt = frame_has_errors(&frame.bits, ctx.cfg.error_detection);

        if self.role == NodeRole::Host {
            self.received_data.push(DataRow {
                time: ctx.time,
                source: frame.src,
                payload_hex: bits::bits_to_hex(&frame.payload),
                error: corrupt,
            });
        }
        if corrupt {
            self.base
                .events
                .push(ctx.time, "Error", "Corrupt frame dropped");
            return;
        }

        if let Some(arp_ip) = frame.arp_payload() {
            if frame.dest.is_broadcast() {
                // Query: answer if the address is ours.
                if self.ips.iter().flatten().any(|&local| local == arp_ip) {
                    self.send_arp_reply(frame.src, port, ctx);
                }
            } else {
                // Reply: learn the mapping and flush parked packets.
                self.ip_table.insert(arp_ip.raw(), frame.src);
                if let Some(parked) = self.waiting_arp.remove(&arp_ip.raw()) {
                    for packet_bits in parked {
                        self.send_frame(frame.src, packet_bits, port, ctx);
                    }
                }
            }
            return;
        }

        if let Some(packet) = IpPacket::parse(&frame.payload) {
            self.on_ip_packet(packet, port, frame.src, ctx);
        }
    }

    fn on_ip_packet(
        &mut self,
        packet: IpPacket,
        port: usize,
        src_mac: MacAddr,
        ctx: &mut TickCtx<'_>,
    ) {
        match self.role {
            NodeRole::Router => self.enroute(packet, Some((port, src_mac)), ctx),
            NodeRole::Host => {
                if Some(packet.dest) != self.ips[0] {
                    return;
                }
                let message = if packet.protocol == 1 {
                    let code = bits::bits_to_int(&packet.payload);
                    if code == ICMP_ECHO_REQUEST {
                        if let Some(local) = self.ips[0] {
                            self.send_packet(IpPacket::echo_reply(packet.src, local), ctx);
                        }
                    }
                    icmp_payload_message(code).to_string()
                } else {
                    bits::bits_to_hex(&packet.payload)
                };
                self.received_payload.push(PayloadRow {
                    time: ctx.time,
                    source: packet.src,
                    message,
                });
            }
        }
    }

    /// Write the host's data and payload files next to its event log.
    pub fn save_data_files(&self, dir: &Path) -> io::Result<()> {
        if self.role != NodeRole::Host {
            return Ok(());
        }
        let mut data = String::new();
        for row in &self.received_data {
            let _ = write!(data, "{} {} {}", row.time, row.source, row.payload_hex);
            if row.error {
                data.push_str(" ERROR");
            }
            data.push('\n');
        }
        fs::write(dir.join(format!("{}_data.txt", self.base.name)), data)?;

        let mut payload = String::new();
        for row in &self.received_payload {
            let _ = writeln!(payload, "{} {} {}", row.time, row.source, row.message);
        }
        fs::write(dir.join(format!("{}_payload.txt", self.base.name)), payload)
    }
}
