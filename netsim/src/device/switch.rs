//! Learning bridge.

use std::collections::BTreeMap;

use log::debug;

use crate::device::logs::TraceLog;
use crate::device::port_device::PortBase;
use crate::device::TickCtx;
use crate::link::{Frame, MacAddr};

/// Store-and-forward switch with a learned MAC table.
///
/// The table maps a source MAC to the name of the port it was last seen on.
/// Frames to unknown or broadcast destinations flood every other connected
/// port; learned destinations get the raw frame bits on their port only.
pub struct Switch {
    pub base: PortBase,
    mac_table: BTreeMap<MacAddr, String>,
    trace: TraceLog,
    /// Gates one trace row per signal window.
    window: u32,
}

impl Switch {
    pub fn new(name: &str, index: usize, port_count: usize, signal_time: u32) -> Switch {
        let base = PortBase::new(name, index, port_count, signal_time);
        Switch {
            trace: TraceLog::new(name, &base.port_names()),
            base,
            mac_table: BTreeMap::new(),
            window: 0,
        }
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn mac_table(&self) -> &BTreeMap<MacAddr, String> {
        &self.mac_table
    }

    pub fn update(&mut self, ctx: &mut TickCtx<'_>) {
        for port in 0..self.base.ports.len() {
            if let Some(frame) = self.base.tick_port(port, ctx, false) {
                self.on_frame(frame, port);
            }
        }
        self.trace_window(ctx);
    }

    fn on_frame(&mut self, frame: Frame, port: usize) {
        debug!(target: "switch", "{} port {}: received {}", self.base.name, port + 1, frame);
        let port_name = self.base.ports[port].name.clone();
        self.mac_table.insert(frame.src, port_name);

        let known_port = self
            .mac_table
            .get(&frame.dest)
            .and_then(|name| self.base.ports.iter().position(|p| &p.name == name));
        match known_port {
            Some(out) if !frame.dest.is_broadcast() => {
                self.base.phys[out].send(vec![frame.bits]);
            }
            _ => self.base.broadcast(port, &frame.bits),
        }
    }

    /// One trace row per signal window, skipped while every port is quiet.
    fn trace_window(&mut self, ctx: &mut TickCtx<'_>) {
        if self.window > 0 {
            self.window -= 1;
            return;
        }
        self.window = ctx.cfg.signal_time;
        let mut received = Vec::with_capacity(self.base.ports.len());
        let mut sent = Vec::with_capacity(self.base.ports.len());
        for (i, port) in self.base.ports.iter().enumerate() {
            match port.cable {
                Some(cable) => {
                    received.push(ctx.medium.read(cable, self.base.handle(i), true).to_string());
                    sent.push(ctx.medium.read(cable, self.base.handle(i), false).to_string());
                }
                None => {
                    received.push("-".to_string());
                    sent.push("-".to_string());
                }
            }
        }
        let busy = received.iter().chain(&sent).any(|v| v != "-" && v != "Null");
        if busy {
            self.trace.push(ctx.time, &received, &sent);
        }
    }
}
