//! Shared state for devices whose ports carry a physical layer.
//!
//! Switches, hosts and routers all own one [`PhysicalLayer`] and one receive
//! buffer per port. The buffer is re-parsed on every committed bit; once it
//! holds a complete frame it is cleared and the frame is handed to the
//! owning device.

use log::debug;

use crate::bits::Bit;
use crate::device::logs::EventLog;
use crate::device::TickCtx;
use crate::link::Frame;
use crate::phy::{CableId, LineEvent, PhysicalLayer, PortHandle};

/// One port and the cable it is plugged into, if any.
pub struct PortState {
    pub name: String,
    pub cable: Option<CableId>,
}

/// Ports, physical layers and receive buffers of a multi-port device.
pub struct PortBase {
    pub name: String,
    /// Slot of the owning device in the simulation's device list.
    pub index: usize,
    pub ports: Vec<PortState>,
    pub phys: Vec<PhysicalLayer>,
    pub buffers: Vec<Vec<Bit>>,
    pub events: EventLog,
}

impl PortBase {
    pub fn new(name: &str, index: usize, port_count: usize, signal_time: u32) -> PortBase {
        let mut ports = Vec::with_capacity(port_count);
        let mut phys = Vec::with_capacity(port_count);
        let mut buffers = Vec::with_capacity(port_count);
        for i in 0..port_count {
            ports.push(PortState {
                name: format!("{}_{}", name, i + 1),
                cable: None,
            });
            phys.push(PhysicalLayer::new(signal_time));
            buffers.push(Vec::new());
        }
        PortBase {
            name: name.to_string(),
            index,
            ports,
            phys,
            buffers,
            events: EventLog::new(name),
        }
    }

    pub fn handle(&self, port: usize) -> PortHandle {
        PortHandle {
            device: self.index,
            port,
        }
    }

    pub fn port_names(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.name.clone()).collect()
    }

    /// True while any port still has bits to push or a pending backoff.
    pub fn is_active(&self) -> bool {
        self.ports
            .iter()
            .zip(&self.phys)
            .any(|(port, phy)| phy.is_active(port.cable.is_some()))
    }

    pub fn attach(&mut self, port: usize, cable: CableId, time: u64) {
        self.ports[port].cable = Some(cable);
        let info = self.ports[port].name.clone();
        self.events.push(time, "Connected", &info);
    }

    pub fn detach(&mut self, port: usize, signal_time: u32, time: u64) {
        self.ports[port].cable = None;
        self.phys[port].disconnect(signal_time);
        self.buffers[port].clear();
        let info = self.ports[port].name.clone();
        self.events.push(time, "Disconnected", &info);
    }

    /// The far end wrote our inbound wire: re-sample it.
    pub fn port_written(&mut self, port: usize, ctx: &mut TickCtx<'_>) {
        if let Some(cable) = self.ports[port].cable {
            let value = ctx.medium.read(cable, self.handle(port), true);
            self.phys[port].port_written(value, ctx.cfg.signal_time);
        }
    }

    /// Advance one port by one tick.
    ///
    /// Runs the sample phase, feeds a committed bit through the receive
    /// buffer, then runs the transmit phase. Returns a frame when the buffer
    /// completes one; the buffer is already cleared at that point.
    pub fn tick_port(
        &mut self,
        port: usize,
        ctx: &mut TickCtx<'_>,
        log_bits: bool,
    ) -> Option<Frame> {
        let Some(cable) = self.ports[port].cable else {
            return None;
        };
        let signal_time = ctx.cfg.signal_time;
        let handle = self.handle(port);
        let mut completed = None;

        match self.phys[port].sample(signal_time, ctx.rng) {
            Some(LineEvent::Received(bit)) => {
                if log_bits {
                    self.events.push(ctx.time, "Received", &bit.to_string());
                }
                self.buffers[port].push(bit);
                if let Some(frame) = Frame::parse(&self.buffers[port]) {
                    self.buffers[port].clear();
                    completed = Some(frame);
                }
            }
            Some(LineEvent::Collision { backoff }) => {
                // Whatever was accumulating on this port died with the
                // collision; the sender starts the frame over.
                self.buffers[port].clear();
                if let Some(wait) = backoff {
                    debug!(
                        target: "phy",
                        "{}: collision, holding off {wait}ms",
                        self.ports[port].name
                    );
                    if log_bits {
                        self.events
                            .push(ctx.time, "Collision", &format!("Waiting {wait}ms to send"));
                    }
                }
            }
            None => {}
        }

        if let Some(bit) = self.phys[port].transmit(ctx.medium, cable, handle, signal_time, ctx.rng)
        {
            if log_bits {
                self.events.push(ctx.time, "Sent", &bit.to_string());
            }
        }
        completed
    }

    /// Queue a raw bit vector on every other connected port.
    pub fn broadcast(&mut self, from_port: usize, data: &[Bit]) {
        for (i, port) in self.ports.iter().enumerate() {
            if i != from_port && port.cable.is_some() {
                self.phys[i].send(vec![data.to_vec()]);
            }
        }
    }
}
