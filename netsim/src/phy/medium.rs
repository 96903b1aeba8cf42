//! Duplex cables and the shared medium.
//!
//! The medium owns every cable in the simulation. Devices hold [`CableId`]
//! handles in their ports and never reference each other directly; a write
//! enqueues a notification for the receiving port, which the engine delivers
//! to the owning device within the same tick.

use std::collections::VecDeque;

use crate::bits::Bit;
use crate::phy::wire::Wire;

/// Stable address of one device port: device slot plus port index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PortHandle {
    pub device: usize,
    pub port: usize,
}

/// Handle to a cable inside the medium.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CableId(usize);

/// Full-duplex cable: two one-directional wires between two ports.
#[derive(Debug)]
struct Duplex {
    end_a: PortHandle,
    end_b: PortHandle,
    /// Driven by `end_a`, received by `end_b`.
    wire_ab: Wire,
    /// Driven by `end_b`, received by `end_a`.
    wire_ba: Wire,
}

impl Duplex {
    fn far_end(&self, from: PortHandle) -> PortHandle {
        if from == self.end_a {
            self.end_b
        } else {
            self.end_a
        }
    }
}

/// All cables plus the pending write notifications of the current tick.
pub struct Medium {
    cables: Vec<Option<Duplex>>,
    pending: VecDeque<PortHandle>,
    signal_time: u32,
}

impl Medium {
    pub fn new(signal_time: u32) -> Medium {
        Medium {
            cables: Vec::new(),
            pending: VecDeque::new(),
            signal_time,
        }
    }

    /// Lay a new cable between two ports.
    pub fn connect(&mut self, end_a: PortHandle, end_b: PortHandle) -> CableId {
        let duplex = Duplex {
            end_a,
            end_b,
            wire_ab: Wire::new(),
            wire_ba: Wire::new(),
        };
        for (i, slot) in self.cables.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(duplex);
                return CableId(i);
            }
        }
        self.cables.push(Some(duplex));
        CableId(self.cables.len() - 1)
    }

    /// Remove a cable, returning its two endpoints for device-side cleanup.
    pub fn disconnect(&mut self, id: CableId) -> Option<(PortHandle, PortHandle)> {
        self.cables
            .get_mut(id.0)
            .and_then(Option::take)
            .map(|d| (d.end_a, d.end_b))
    }

    /// Drive a value from one end of a cable.
    ///
    /// The cable is a shared medium: if the opposite direction carries an
    /// unexpired signal, both wires are corrupted to `Collision` and both
    /// receivers (including the writer itself) get notified. That is how a
    /// transmitting station samples the collision it caused.
    pub fn write(&mut self, id: CableId, from: PortHandle, value: Bit) {
        let signal_time = self.signal_time;
        let Some(duplex) = self.cables.get_mut(id.0).and_then(Option::as_mut) else {
            return;
        };
        let far = duplex.far_end(from);
        let (tx, rx) = if from == duplex.end_a {
            (&mut duplex.wire_ab, &mut duplex.wire_ba)
        } else {
            (&mut duplex.wire_ba, &mut duplex.wire_ab)
        };

        if !rx.is_idle() {
            tx.write(Bit::Collision, signal_time);
            let rx_changed = rx.corrupt();
            self.pending.push_back(far);
            if rx_changed {
                self.pending.push_back(from);
            }
        } else {
            tx.write(value, signal_time);
            self.pending.push_back(far);
        }
    }

    /// Read the wire a port receives on, or with `received = false` the wire
    /// it most recently drove.
    pub fn read(&self, id: CableId, at: PortHandle, received: bool) -> Bit {
        let Some(duplex) = self.cables.get(id.0).and_then(Option::as_ref) else {
            return Bit::Null;
        };
        let from_a = at == duplex.end_a;
        let wire = if from_a == received {
            &duplex.wire_ba
        } else {
            &duplex.wire_ab
        };
        wire.value()
    }

    /// Carrier sense: true if this end may start driving a bit this tick.
    ///
    /// Both directions must be quiet; a station does not start transmitting
    /// into a signal it is currently receiving.
    pub fn can_write(&self, id: CableId, _at: PortHandle) -> bool {
        let Some(duplex) = self.cables.get(id.0).and_then(Option::as_ref) else {
            return false;
        };
        duplex.wire_ab.can_write(self.signal_time) && duplex.wire_ba.can_write(self.signal_time)
    }

    /// Next port whose inbound wire was written, if any.
    pub fn take_notification(&mut self) -> Option<PortHandle> {
        self.pending.pop_front()
    }

    /// End-of-tick decay of every wire.
    pub fn update(&mut self) {
        for duplex in self.cables.iter_mut().flatten() {
            duplex.wire_ab.update();
            duplex.wire_ba.update();
        }
    }
}
