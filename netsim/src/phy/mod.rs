//! Physical layer: wires, cables and the per-port send/receive engine.

mod layer;
mod medium;
mod wire;

pub use layer::{LineEvent, PhysicalLayer};
pub use medium::{CableId, Medium, PortHandle};
pub use wire::Wire;
