//! Discrete-time network simulator.
//!
//! Models a small TCP/IP stack from the wire upward: a four-valued physical
//! medium with collision detection and exponential backoff, framed links
//! with an integrity trailer, learning switches, and hosts/routers with
//! ARP-style resolution, longest-prefix routing and an ICMP-like echo
//! protocol. A scenario is a time-sorted list of [`Instruction`]s executed
//! by the [`Simulation`] engine one virtual millisecond at a time.
//!
//! ## Module structure
//!
//! - `bits` - the bit alphabet and field serialization
//! - `phy` - wires, cables and the per-port CSMA engine
//! - `link` - frames and error detection
//! - `net` - IP addresses, packets and routing tables
//! - `device` - hubs, switches, hosts and routers
//! - `instruction` - the operations a script can schedule
//! - `simulation` - the tick loop
//! - `config` - the scalar settings threaded through everything

pub mod bits;
pub mod config;
pub mod device;
pub mod error;
pub mod instruction;
pub mod link;
pub mod net;
pub mod phy;
pub mod simulation;

pub use config::{ErrorDetection, SimConfig};
pub use error::SimError;
pub use instruction::{Instruction, Op};
pub use simulation::{new_rng, Simulation};
