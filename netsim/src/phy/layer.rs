//! Per-port transmit/receive engine with CSMA and exponential backoff.
//!
//! One `PhysicalLayer` drives one port. Outbound data is queued as
//! byte-aligned bit packets; each bit occupies the wire for `signal_time`
//! ticks. Inbound bits are sampled on every remote write and committed once
//! per signal window. The update is split in two phases so the owning device
//! can react to a committed bit (deliver it upward, or back off on a
//! collision) before the transmit side of the same tick runs.

use std::collections::VecDeque;

use rand::Rng;
use rand_xorshift::XorShiftRng;

use crate::bits::Bit;
use crate::phy::medium::{CableId, Medium, PortHandle};

/// Outcome of the sample phase of one tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LineEvent {
    /// A bit finished its signal window and is delivered upward.
    Received(Bit),
    /// The signal window ended in a collision. Any frame in flight on this
    /// port is dead; the sender retransmits it from the start.
    Collision {
        /// Ticks this layer holds off before retrying, when it was the one
        /// transmitting. `None` for a pure observer.
        backoff: Option<u32>,
    },
}

/// Send engine state for one port.
pub struct PhysicalLayer {
    queue: VecDeque<Vec<Bit>>,
    current: Vec<Bit>,
    index: usize,
    /// Ticks spent on the current bit, `0..signal_time`.
    send_time: u32,
    /// Remaining backoff hold, in ticks.
    time_to_send: u32,
    /// Upper bound of the backoff window, in signal windows. Doubles on each
    /// collision, resets with every new packet.
    max_time_to_send: u32,
    /// Ticks until the last sampled bit commits.
    read_time: u32,
    last_sampled: Bit,
    is_sending: bool,
    time_connected: u64,
}

impl PhysicalLayer {
    pub fn new(signal_time: u32) -> PhysicalLayer {
        PhysicalLayer {
            queue: VecDeque::new(),
            current: Vec::new(),
            index: 0,
            send_time: 0,
            time_to_send: 0,
            max_time_to_send: signal_time,
            read_time: 0,
            last_sampled: Bit::Null,
            is_sending: false,
            time_connected: 0,
        }
    }

    /// Queue byte-aligned packets for transmission.
    pub fn send(&mut self, packets: Vec<Vec<Bit>>) {
        self.queue.extend(packets);
    }

    /// True while there is something to push onto the wire.
    pub fn is_active(&self, connected: bool) -> bool {
        (self.is_sending || self.time_to_send > 0) && connected
    }

    /// Remote-write hook: the far end of the cable drove a value.
    ///
    /// The first write of a window starts the accumulation countdown; each
    /// write re-samples, so a later corruption of the window is still seen.
    pub fn port_written(&mut self, value: Bit, signal_time: u32) {
        if self.read_time == 0 {
            self.read_time = signal_time;
        }
        self.last_sampled = value;
    }

    /// Receive side of one tick. Call only while the port has a cable.
    pub fn sample(&mut self, signal_time: u32, rng: &mut XorShiftRng) -> Option<LineEvent> {
        self.time_connected += 1;

        if self.read_time == 0 {
            return None;
        }
        self.read_time -= 1;
        if self.read_time > 0 {
            return None;
        }
        self.read_time = signal_time;

        match self.last_sampled {
            Bit::Collision => {
                let backoff = self
                    .is_sending
                    .then(|| self.back_off(signal_time, rng));
                Some(LineEvent::Collision { backoff })
            }
            Bit::Null => None,
            bit => Some(LineEvent::Received(bit)),
        }
    }

    /// Transmit side of one tick. Returns the bit put on the wire, if any.
    pub fn transmit(
        &mut self,
        medium: &mut Medium,
        cable: CableId,
        at: PortHandle,
        signal_time: u32,
        rng: &mut XorShiftRng,
    ) -> Option<Bit> {
        self.load_packet(medium, cable, at, signal_time);

        if self.time_to_send > 0 {
            self.time_to_send -= 1;
            if self.time_to_send > 0 {
                return None;
            }
        }

        if self.current.is_empty() {
            return None;
        }
        self.is_sending = true;
        let bit = self.current[self.index];

        let mut sent = None;
        if self.send_time == 0 {
            if !medium.can_write(cable, at) {
                self.back_off(signal_time, rng);
                return None;
            }
            medium.write(cable, at, bit);
            sent = Some(bit);
        }

        self.send_time += 1;
        if self.send_time == signal_time {
            self.index += 1;
            if self.index == self.current.len() {
                self.current.clear();
            }
            self.send_time = 0;
        }
        sent
    }

    /// Drop all transmission state when the port loses its cable.
    ///
    /// An in-flight packet goes back to the head of the queue and will be
    /// retransmitted from the start on reconnection.
    pub fn disconnect(&mut self, signal_time: u32) {
        if !self.current.is_empty() {
            let packet = core::mem::take(&mut self.current);
            self.queue.push_front(packet);
        }
        self.index = 0;
        self.send_time = 0;
        self.time_to_send = 0;
        self.max_time_to_send = signal_time;
        self.read_time = 0;
        self.last_sampled = Bit::Null;
        self.is_sending = false;
        self.time_connected = 0;
    }

    fn load_packet(
        &mut self,
        medium: &mut Medium,
        cable: CableId,
        at: PortHandle,
        signal_time: u32,
    ) {
        if !self.current.is_empty() {
            return;
        }
        if let Some(next) = self.queue.pop_front() {
            self.current = next;
            self.index = 0;
            self.send_time = 0;
            self.max_time_to_send = signal_time;
            self.is_sending = true;
        } else if self.is_sending {
            // Last packet exhausted: release the wire.
            medium.write(cable, at, Bit::Null);
            self.is_sending = false;
        }
    }

    /// Binary exponential backoff. Returns the chosen hold in ticks.
    fn back_off(&mut self, signal_time: u32, rng: &mut XorShiftRng) -> u32 {
        let slots = rng.gen_range(1..=self.max_time_to_send);
        self.time_to_send = slots * signal_time;
        self.max_time_to_send = self.max_time_to_send.saturating_mul(2);
        self.index = 0;
        self.send_time = 0;
        self.is_sending = false;
        self.time_to_send
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    const ST: u32 = 10;

    fn rng() -> XorShiftRng {
        XorShiftRng::from_seed([7; 16])
    }

    fn medium_pair() -> (Medium, CableId, PortHandle, PortHandle) {
        let mut medium = Medium::new(ST);
        let a = PortHandle { device: 0, port: 0 };
        let b = PortHandle { device: 1, port: 0 };
        let cable = medium.connect(a, b);
        (medium, cable, a, b)
    }

    #[test]
    fn transmits_one_bit_per_signal_window() {
        let (mut medium, cable, a, _b) = medium_pair();
        let mut rng = rng();
        let mut layer = PhysicalLayer::new(ST);
        layer.send(vec![vec![Bit::One, Bit::Zero]]);

        let mut writes = Vec::new();
        for _ in 0..3 * ST {
            if let Some(bit) = layer.transmit(&mut medium, cable, a, ST, &mut rng) {
                writes.push(bit);
            }
            medium.update();
        }
        assert_eq!(writes, vec![Bit::One, Bit::Zero]);
        assert!(!layer.is_active(true));
    }

    #[test]
    fn commits_a_sampled_bit_after_one_window() {
        let mut rng = rng();
        let mut layer = PhysicalLayer::new(ST);
        layer.port_written(Bit::One, ST);

        let mut events = Vec::new();
        for _ in 0..ST {
            if let Some(ev) = layer.sample(ST, &mut rng) {
                events.push(ev);
            }
        }
        assert_eq!(events, vec![LineEvent::Received(Bit::One)]);
    }

    #[test]
    fn collision_while_sending_backs_off() {
        let (mut medium, cable, a, _b) = medium_pair();
        let mut rng = rng();
        let mut layer = PhysicalLayer::new(ST);
        layer.send(vec![vec![Bit::One, Bit::One]]);
        layer.transmit(&mut medium, cable, a, ST, &mut rng);
        assert!(layer.is_sending);

        layer.port_written(Bit::Collision, ST);
        let mut event = None;
        for _ in 0..ST {
            if let Some(ev) = layer.sample(ST, &mut rng) {
                event = Some(ev);
            }
        }
        match event {
            Some(LineEvent::Collision {
                backoff: Some(wait),
            }) => {
                assert!(wait >= ST);
                assert_eq!(wait % ST, 0);
                assert!(layer.is_active(true));
            }
            other => panic!("expected a collision event, got {other:?}"),
        }
        // The retransmission starts from the first bit.
        assert_eq!(layer.index, 0);
    }

    #[test]
    fn busy_medium_defers_the_sender() {
        let (mut medium, cable, a, b) = medium_pair();
        let mut rng = rng();

        // The far end occupies the cable, observed one tick later.
        medium.write(cable, b, Bit::Zero);
        medium.update();

        let mut layer = PhysicalLayer::new(ST);
        layer.send(vec![vec![Bit::One]]);
        assert_eq!(layer.transmit(&mut medium, cable, a, ST, &mut rng), None);
        assert!(layer.time_to_send > 0);
    }

    #[test]
    fn disconnect_requeues_the_packet_in_flight() {
        let (mut medium, cable, a, _b) = medium_pair();
        let mut rng = rng();
        let mut layer = PhysicalLayer::new(ST);
        layer.send(vec![vec![Bit::One, Bit::Zero]]);
        layer.transmit(&mut medium, cable, a, ST, &mut rng);

        layer.disconnect(ST);
        assert!(!layer.is_sending);
        assert_eq!(layer.queue.len(), 1);
        assert_eq!(layer.queue[0], vec![Bit::One, Bit::Zero]);
    }
}
