//! Hub: bit-level repeater.

use crate::device::logs::TraceLog;
use crate::device::TickCtx;
use crate::phy::{CableId, PortHandle};

/// A hub retransmits every bit read on one port to all other ports, within
/// the same tick. It has no physical layer of its own and never initiates
/// traffic.
pub struct Hub {
    pub name: String,
    pub index: usize,
    port_names: Vec<String>,
    cables: Vec<Option<CableId>>,
    /// Gates one trace row per signal window.
    read_time: u32,
    received: Vec<String>,
    sent: Vec<String>,
    trace: TraceLog,
}

impl Hub {
    pub fn new(name: &str, index: usize, port_count: usize) -> Hub {
        let port_names: Vec<String> =
            (1..=port_count).map(|i| format!("{name}_{i}")).collect();
        Hub {
            name: name.to_string(),
            index,
            trace: TraceLog::new(name, &port_names),
            port_names,
            cables: vec![None; port_count],
            read_time: 0,
            received: vec!["-".to_string(); port_count],
            sent: vec!["-".to_string(); port_count],
        }
    }

    pub fn port_count(&self) -> usize {
        self.cables.len()
    }

    pub fn port_names(&self) -> &[String] {
        &self.port_names
    }

    pub fn cable(&self, port: usize) -> Option<CableId> {
        self.cables[port]
    }

    pub fn attach(&mut self, port: usize, cable: CableId) {
        self.cables[port] = Some(cable);
    }

    pub fn detach(&mut self, port: usize) {
        self.cables[port] = None;
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    fn handle(&self, port: usize) -> PortHandle {
        PortHandle {
            device: self.index,
            port,
        }
    }

    fn port_value(&self, ctx: &TickCtx<'_>, port: usize, received: bool) -> String {
        match self.cables[port] {
            Some(cable) => ctx.medium.read(cable, self.handle(port), received).to_string(),
            None => "-".to_string(),
        }
    }

    /// Repeat the freshly written bit out of every other connected port.
    pub fn port_written(&mut self, port: usize, ctx: &mut TickCtx<'_>) {
        if self.read_time == 0 {
            self.read_time = ctx.cfg.signal_time;
        }
        let Some(cable) = self.cables[port] else {
            return;
        };
        let value = ctx.medium.read(cable, self.handle(port), true);
        self.received = (0..self.cables.len())
            .map(|i| self.port_value(ctx, i, true))
            .collect();

        for i in 0..self.cables.len() {
            if i == port {
                continue;
            }
            if let Some(out) = self.cables[i] {
                ctx.medium.write(out, self.handle(i), value);
            }
        }
        self.sent = (0..self.cables.len())
            .map(|i| self.port_value(ctx, i, false))
            .collect();
    }

    /// One trace row per signal window.
    pub fn update(&mut self, ctx: &mut TickCtx<'_>) {
        if self.read_time > 0 {
            self.read_time -= 1;
        }
        if self.read_time == 0 {
            self.trace.push(ctx.time, &self.received, &self.sent);
            self.read_time = ctx.cfg.signal_time;
        }
    }
}
