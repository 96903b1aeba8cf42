//! The discrete-time simulation engine.
//!
//! One tick is one simulated millisecond. Per tick: execute every
//! instruction scheduled for the current time, reset the devices, update
//! hosts, update the remaining devices, and finally let the wires decay.
//! Write notifications raised by a device are delivered before the next
//! device updates, so everything a write causes stays inside the tick that
//! produced it.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::Path;

use log::{info, warn};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::config::SimConfig;
use crate::device::{Device, Hub, Node, NodeRole, Switch, TickCtx};
use crate::error::SimError;
use crate::instruction::{Instruction, Op};
use crate::net::IpPacket;
use crate::phy::{Medium, PortHandle};

/// Upper bound on write notifications delivered after one device update.
/// Only a cabling loop (a broadcast storm) can reach it.
const NOTIFY_LIMIT: usize = 10_000;

/// Deterministic RNG from a 64-bit seed.
pub fn new_rng(mut seed: u64) -> XorShiftRng {
    if seed == 0 {
        // An all-zero state would keep the generator stuck.
        seed = 1;
    }
    let mut state = [0u8; 16];
    state[0..8].copy_from_slice(&seed.to_le_bytes());
    state[8..16].copy_from_slice(&seed.to_le_bytes());
    XorShiftRng::from_seed(state)
}

/// Owner of every device, port and cable of one simulated network.
pub struct Simulation {
    cfg: SimConfig,
    devices: Vec<Device>,
    names: BTreeMap<String, usize>,
    ports: BTreeMap<String, PortHandle>,
    medium: Medium,
    rng: XorShiftRng,
    queue: VecDeque<Instruction>,
    time: u64,
    /// Post-quiescence drain, in ticks; refilled while anything is active.
    grace: u32,
}

impl Simulation {
    pub fn new(cfg: SimConfig) -> Simulation {
        Simulation {
            devices: Vec::new(),
            names: BTreeMap::new(),
            ports: BTreeMap::new(),
            medium: Medium::new(cfg.signal_time),
            rng: new_rng(cfg.seed),
            queue: VecDeque::new(),
            time: 0,
            grace: 2 * cfg.signal_time,
            cfg,
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.names.get(name).map(|&i| &self.devices[i])
    }

    /// Run a list of instructions to completion.
    ///
    /// The list is (re-)sorted by time, stably, before execution. The run
    /// ends once no instructions are pending, no device is active and the
    /// grace window has drained the bits still in flight.
    pub fn run(&mut self, mut instructions: Vec<Instruction>) -> Result<(), SimError> {
        instructions.sort_by_key(|inst| inst.time);
        self.queue = instructions.into();
        while self.is_running() {
            self.step()?;
        }
        info!(target: "engine", "simulation finished after {} ms", self.time);
        Ok(())
    }

    /// Persist every device's log files into `dir`.
    pub fn save_logs(&self, dir: &Path) -> io::Result<()> {
        for device in &self.devices {
            device.save_log(dir)?;
        }
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        let active =
            !self.queue.is_empty() || self.devices.iter().any(Device::is_active);
        if active {
            self.grace = 2 * self.cfg.signal_time;
            return true;
        }
        if self.grace == 0 {
            return false;
        }
        self.grace -= 1;
        true
    }

    fn step(&mut self) -> Result<(), SimError> {
        while self
            .queue
            .front()
            .map_or(false, |inst| inst.time == self.time)
        {
            if let Some(inst) = self.queue.pop_front() {
                self.execute(inst)?;
            }
        }

        for device in &mut self.devices {
            device.reset();
        }

        // Hosts first, then everything else, each in insertion order.
        for hosts_pass in [true, false] {
            for i in 0..self.devices.len() {
                if self.devices[i].is_host() == hosts_pass {
                    self.update_device(i);
                }
            }
        }

        self.medium.update();
        self.time += 1;
        Ok(())
    }

    /// Update one device, then deliver every notification its writes caused.
    fn update_device(&mut self, index: usize) {
        let Simulation {
            devices,
            medium,
            rng,
            cfg,
            time,
            ..
        } = self;
        let mut ctx = TickCtx {
            time: *time,
            cfg,
            medium,
            rng,
        };
        devices[index].update(&mut ctx);

        let mut remaining = NOTIFY_LIMIT;
        while let Some(written) = ctx.medium.take_notification() {
            if remaining == 0 {
                warn!(
                    target: "engine",
                    "notification limit reached at t={}; cabling loop?", ctx.time
                );
                while ctx.medium.take_notification().is_some() {}
                break;
            }
            remaining -= 1;
            if let Some(device) = devices.get_mut(written.device) {
                device.on_port_written(written.port, &mut ctx);
            }
        }
    }

    fn device_index(&self, name: &str) -> Result<usize, SimError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownDevice(name.to_string()))
    }

    fn add_device(&mut self, device: Device) -> Result<(), SimError> {
        let name = device.name().to_string();
        if self.names.contains_key(&name) {
            return Err(SimError::DuplicateDevice(name));
        }
        let index = self.devices.len();
        for (port, port_name) in device.port_names().into_iter().enumerate() {
            self.ports.insert(
                port_name,
                PortHandle {
                    device: index,
                    port,
                },
            );
        }
        info!(target: "engine", "adding device {name}");
        self.names.insert(name, index);
        self.devices.push(device);
        Ok(())
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut Node, SimError> {
        let index = self.device_index(name)?;
        self.devices[index]
            .as_node_mut()
            .ok_or_else(|| SimError::NotANetworkDevice(name.to_string()))
    }

    fn check_interface(node: &Node, name: &str, interface: usize) -> Result<(), SimError> {
        if interface == 0 || interface > node.port_count() {
            return Err(SimError::NoSuchInterface {
                device: name.to_string(),
                interface,
            });
        }
        Ok(())
    }

    fn execute(&mut self, inst: Instruction) -> Result<(), SimError> {
        info!(target: "engine", "t={}: {}", self.time, inst.op);
        let time = self.time;
        let signal_time = self.cfg.signal_time;
        match inst.op {
            Op::CreateHost { name } => {
                let index = self.devices.len();
                let node = Node::new(&name, index, NodeRole::Host, 1, signal_time);
                self.add_device(Device::Host(node))
            }
            Op::CreateHub { name, ports } => {
                let index = self.devices.len();
                self.add_device(Device::Hub(Hub::new(&name, index, ports)))
            }
            Op::CreateSwitch { name, ports } => {
                let index = self.devices.len();
                let switch = Switch::new(&name, index, ports, signal_time);
                self.add_device(Device::Switch(switch))
            }
            Op::CreateRouter { name, ports } => {
                let index = self.devices.len();
                let node = Node::new(&name, index, NodeRole::Router, ports, signal_time);
                self.add_device(Device::Router(node))
            }
            Op::Connect { port_a, port_b } => {
                let a = *self
                    .ports
                    .get(&port_a)
                    .ok_or_else(|| SimError::UnknownPort(port_a.clone()))?;
                let b = *self
                    .ports
                    .get(&port_b)
                    .ok_or_else(|| SimError::UnknownPort(port_b.clone()))?;
                if self.devices[a.device].cable(a.port).is_some() {
                    return Err(SimError::PortInUse(port_a));
                }
                if self.devices[b.device].cable(b.port).is_some() {
                    return Err(SimError::PortInUse(port_b));
                }
                let cable = self.medium.connect(a, b);
                self.devices[a.device].attach(a.port, cable, time);
                self.devices[b.device].attach(b.port, cable, time);
                Ok(())
            }
            Op::Disconnect { port } => {
                let handle = *self
                    .ports
                    .get(&port)
                    .ok_or_else(|| SimError::UnknownPort(port.clone()))?;
                let cable = self.devices[handle.device]
                    .cable(handle.port)
                    .ok_or(SimError::PortNotConnected(port))?;
                if let Some((a, b)) = self.medium.disconnect(cable) {
                    self.devices[a.device].detach(a.port, signal_time, time);
                    self.devices[b.device].detach(b.port, signal_time, time);
                }
                Ok(())
            }
            Op::SetMac {
                device,
                interface,
                mac,
            } => {
                let node = self.node_mut(&device)?;
                Self::check_interface(node, &device, interface)?;
                node.set_mac(interface, mac, time);
                Ok(())
            }
            Op::SetIp {
                device,
                interface,
                ip,
                mask,
            } => {
                let node = self.node_mut(&device)?;
                Self::check_interface(node, &device, interface)?;
                node.set_ip(interface, ip, mask, time);
                Ok(())
            }
            Op::Send { device, data } => {
                self.node_mut(&device)?.send_raw(data);
                Ok(())
            }
            Op::SendFrame { device, dest, data } => {
                let index = self.device_index(&device)?;
                let Simulation {
                    devices,
                    medium,
                    rng,
                    cfg,
                    ..
                } = self;
                let mut ctx = TickCtx {
                    time,
                    cfg,
                    medium,
                    rng,
                };
                let node = devices[index]
                    .as_node_mut()
                    .ok_or(SimError::NotANetworkDevice(device))?;
                node.send_frame(dest, data, 0, &mut ctx);
                Ok(())
            }
            Op::SendPacket { device, dest, data } => {
                let index = self.device_index(&device)?;
                let Simulation {
                    devices,
                    medium,
                    rng,
                    cfg,
                    ..
                } = self;
                let mut ctx = TickCtx {
                    time,
                    cfg,
                    medium,
                    rng,
                };
                let node = devices[index]
                    .as_node_mut()
                    .ok_or(SimError::NotANetworkDevice(device))?;
                match node.ip(1) {
                    Some(src) => node.send_packet(IpPacket::new(dest, src, 0, data), &mut ctx),
                    None => warn!(
                        target: "engine",
                        "{}: no IP assigned, dropping packet to {dest}",
                        node.base.name
                    ),
                }
                Ok(())
            }
            Op::Ping { device, dest } => {
                let index = self.device_index(&device)?;
                let Simulation {
                    devices,
                    medium,
                    rng,
                    cfg,
                    ..
                } = self;
                let mut ctx = TickCtx {
                    time,
                    cfg,
                    medium,
                    rng,
                };
                let node = devices[index]
                    .as_node_mut()
                    .ok_or(SimError::NotANetworkDevice(device))?;
                node.send_ping(dest, &mut ctx);
                Ok(())
            }
            Op::RouteReset { device } => {
                self.node_mut(&device)?.reset_routes();
                Ok(())
            }
            Op::RouteAdd { device, route } => {
                let node = self.node_mut(&device)?;
                Self::check_interface(node, &device, route.interface)?;
                node.add_route(route);
                Ok(())
            }
            Op::RouteRemove { device, route } => {
                let node = self.node_mut(&device)?;
                node.remove_route(&route);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{IpAddress, Route};

    fn sim() -> Simulation {
        Simulation::new(SimConfig {
            error_prob: 0.0,
            ..SimConfig::default()
        })
    }

    fn create_host(time: u64, name: &str) -> Instruction {
        Instruction::new(
            time,
            Op::CreateHost {
                name: name.to_string(),
            },
        )
    }

    #[test]
    fn empty_run_ends_after_the_grace_window() {
        let mut s = sim();
        s.run(Vec::new()).unwrap();
        assert_eq!(s.time(), u64::from(2 * s.cfg.signal_time));
    }

    #[test]
    fn duplicate_device_names_are_fatal() {
        let mut s = sim();
        let err = s
            .run(vec![create_host(0, "H"), create_host(0, "H")])
            .unwrap_err();
        assert_eq!(err, SimError::DuplicateDevice("H".to_string()));
    }

    #[test]
    fn connecting_unknown_ports_is_fatal() {
        let mut s = sim();
        let err = s
            .run(vec![
                create_host(0, "H"),
                Instruction::new(
                    0,
                    Op::Connect {
                        port_a: "H_1".to_string(),
                        port_b: "X_1".to_string(),
                    },
                ),
            ])
            .unwrap_err();
        assert_eq!(err, SimError::UnknownPort("X_1".to_string()));
    }

    #[test]
    fn connecting_a_busy_port_is_fatal() {
        let mut s = sim();
        let connect = |b: &str| {
            Instruction::new(
                0,
                Op::Connect {
                    port_a: "A_1".to_string(),
                    port_b: b.to_string(),
                },
            )
        };
        let err = s
            .run(vec![
                create_host(0, "A"),
                create_host(0, "B"),
                create_host(0, "C"),
                connect("B_1"),
                connect("C_1"),
            ])
            .unwrap_err();
        assert_eq!(err, SimError::PortInUse("A_1".to_string()));
    }

    #[test]
    fn disconnecting_an_idle_port_is_fatal() {
        let mut s = sim();
        let err = s
            .run(vec![
                create_host(0, "H"),
                Instruction::new(
                    0,
                    Op::Disconnect {
                        port: "H_1".to_string(),
                    },
                ),
            ])
            .unwrap_err();
        assert_eq!(err, SimError::PortNotConnected("H_1".to_string()));
    }

    #[test]
    fn network_instructions_need_a_network_device() {
        let mut s = sim();
        let err = s
            .run(vec![
                Instruction::new(
                    0,
                    Op::CreateHub {
                        name: "HUB".to_string(),
                        ports: 4,
                    },
                ),
                Instruction::new(
                    0,
                    Op::SetMac {
                        device: "HUB".to_string(),
                        interface: 1,
                        mac: crate::link::MacAddr(1),
                    },
                ),
            ])
            .unwrap_err();
        assert_eq!(err, SimError::NotANetworkDevice("HUB".to_string()));
    }

    #[test]
    fn routes_must_name_an_existing_interface() {
        let mut s = sim();
        let err = s
            .run(vec![
                create_host(0, "H"),
                Instruction::new(
                    0,
                    Op::RouteAdd {
                        device: "H".to_string(),
                        route: Route::new(
                            IpAddress::UNSPECIFIED,
                            IpAddress::UNSPECIFIED,
                            IpAddress::UNSPECIFIED,
                            3,
                        ),
                    },
                ),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            SimError::NoSuchInterface {
                device: "H".to_string(),
                interface: 3,
            }
        );
    }
}
