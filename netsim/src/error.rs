//! Error types for instruction execution and topology changes.

use core::fmt;

/// Fatal simulation errors.
///
/// Everything here aborts the run: the script referenced a name that does not
/// exist, or asked for a topology change that is not possible. In-simulation
/// events (collisions, corrupt frames, unroutable packets) are never errors;
/// they are confined to the affected transmission and logged.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SimError {
    /// A device with this name already exists.
    DuplicateDevice(String),
    /// No device with this name.
    UnknownDevice(String),
    /// No port with this name.
    UnknownPort(String),
    /// Tried to connect a port that already has a cable.
    PortInUse(String),
    /// Tried to disconnect a port that has no cable.
    PortNotConnected(String),
    /// MAC, IP, route or traffic instruction aimed at a hub or switch.
    NotANetworkDevice(String),
    /// Interface index outside the device's port range.
    NoSuchInterface { device: String, interface: usize },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::DuplicateDevice(name) => {
                write!(f, "the device name {name} is already taken")
            }
            SimError::UnknownDevice(name) => write!(f, "device {name} does not exist"),
            SimError::UnknownPort(name) => write!(f, "port {name} does not exist"),
            SimError::PortInUse(name) => write!(f, "port {name} is currently in use"),
            SimError::PortNotConnected(name) => write!(f, "port {name} is not connected"),
            SimError::NotANetworkDevice(name) => {
                write!(f, "device {name} has no network layer")
            }
            SimError::NoSuchInterface { device, interface } => {
                write!(f, "device {device} has no interface {interface}")
            }
        }
    }
}

impl std::error::Error for SimError {}
