//! Network layer: addresses, IP packets and routing.

mod ip;
mod route;

pub use ip::{
    icmp_payload_message, IpAddress, IpPacket, ICMP_DEST_UNREACHABLE, ICMP_ECHO_REPLY,
    ICMP_ECHO_REQUEST, ICMP_TIME_EXCEEDED,
};
pub use route::{Route, RouteTable};
