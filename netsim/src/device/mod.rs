//! Devices and their shared per-tick context.
//!
//! ## Module structure
//!
//! - `logs` - the two persisted log table formats
//! - `port_device` - ports, physical layers and receive buffers
//! - `hub` - bit-level repeater
//! - `switch` - learning bridge
//! - `node` - hosts and routers (network layer)

mod hub;
mod logs;
mod node;
mod port_device;
mod switch;

use std::io;
use std::path::Path;

use rand_xorshift::XorShiftRng;

pub use hub::Hub;
pub use logs::{EventLog, TraceLog};
pub use node::{DataRow, Node, NodeRole, PayloadRow};
pub use port_device::{PortBase, PortState};
pub use switch::Switch;

use crate::config::SimConfig;
use crate::phy::{CableId, Medium};

/// Everything a device may touch during one tick: the shared medium, the
/// run's RNG, the configuration and the current simulation time.
pub struct TickCtx<'a> {
    pub time: u64,
    pub cfg: &'a SimConfig,
    pub medium: &'a mut Medium,
    pub rng: &'a mut XorShiftRng,
}

/// A device in the simulation.
pub enum Device {
    Hub(Hub),
    Switch(Switch),
    Host(Node),
    Router(Node),
}

impl Device {
    pub fn name(&self) -> &str {
        match self {
            Device::Hub(hub) => &hub.name,
            Device::Switch(switch) => &switch.base.name,
            Device::Host(node) | Device::Router(node) => &node.base.name,
        }
    }

    /// Hosts update ahead of every other device kind within a tick.
    pub fn is_host(&self) -> bool {
        matches!(self, Device::Host(_))
    }

    pub fn is_active(&self) -> bool {
        match self {
            Device::Hub(_) => false,
            Device::Switch(switch) => switch.base.is_active(),
            Device::Host(node) | Device::Router(node) => node.base.is_active(),
        }
    }

    pub fn port_count(&self) -> usize {
        match self {
            Device::Hub(hub) => hub.port_count(),
            Device::Switch(switch) => switch.base.ports.len(),
            Device::Host(node) | Device::Router(node) => node.port_count(),
        }
    }

    pub fn port_names(&self) -> Vec<String> {
        match self {
            Device::Hub(hub) => hub.port_names().to_vec(),
            Device::Switch(switch) => switch.base.port_names(),
            Device::Host(node) | Device::Router(node) => node.base.port_names(),
        }
    }

    pub fn cable(&self, port: usize) -> Option<CableId> {
        match self {
            Device::Hub(hub) => hub.cable(port),
            Device::Switch(switch) => switch.base.ports[port].cable,
            Device::Host(node) | Device::Router(node) => node.base.ports[port].cable,
        }
    }

    pub fn attach(&mut self, port: usize, cable: CableId, time: u64) {
        match self {
            Device::Hub(hub) => hub.attach(port, cable),
            Device::Switch(switch) => switch.base.attach(port, cable, time),
            Device::Host(node) | Device::Router(node) => node.base.attach(port, cable, time),
        }
    }

    pub fn detach(&mut self, port: usize, signal_time: u32, time: u64) {
        match self {
            Device::Hub(hub) => hub.detach(port),
            Device::Switch(switch) => switch.base.detach(port, signal_time, time),
            Device::Host(node) | Device::Router(node) => node.base.detach(port, signal_time, time),
        }
    }

    /// Start-of-tick hook; devices currently carry no per-tick scratch state.
    pub fn reset(&mut self) {}

    pub fn update(&mut self, ctx: &mut TickCtx<'_>) {
        match self {
            Device::Hub(hub) => hub.update(ctx),
            Device::Switch(switch) => switch.update(ctx),
            Device::Host(node) | Device::Router(node) => node.update(ctx),
        }
    }

    /// A cable this device is plugged into was written at the far end.
    pub fn on_port_written(&mut self, port: usize, ctx: &mut TickCtx<'_>) {
        match self {
            Device::Hub(hub) => hub.port_written(port, ctx),
            Device::Switch(switch) => switch.base.port_written(port, ctx),
            Device::Host(node) | Device::Router(node) => node.base.port_written(port, ctx),
        }
    }

    /// The node inside, for network-layer instructions.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Device::Host(node) | Device::Router(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Device::Host(node) | Device::Router(node) => Some(node),
            _ => None,
        }
    }

    /// Persist this device's log files.
    pub fn save_log(&self, dir: &Path) -> io::Result<()> {
        match self {
            Device::Hub(hub) => hub.trace().save(dir),
            Device::Switch(switch) => switch.trace().save(dir),
            Device::Host(node) | Device::Router(node) => {
                node.base.events.save(dir)?;
                node.save_data_files(dir)
            }
        }
    }
}
