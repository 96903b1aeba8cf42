//! IP addresses and the simulator's IP packet format.

use core::fmt;

use crate::bits::{self, Bit};

/// ICMP-like payload codes carried in protocol-1 packets.
pub const ICMP_ECHO_REPLY: u64 = 0;
pub const ICMP_DEST_UNREACHABLE: u64 = 3;
pub const ICMP_ECHO_REQUEST: u64 = 8;
pub const ICMP_TIME_EXCEEDED: u64 = 11;

/// Human-readable name of an ICMP-like payload code.
pub fn icmp_payload_message(code: u64) -> &'static str {
    match code {
        ICMP_ECHO_REPLY => "echo reply",
        ICMP_DEST_UNREACHABLE => "destination host unreachable",
        ICMP_ECHO_REQUEST => "echo request",
        ICMP_TIME_EXCEEDED => "time exceeded",
        _ => "unknown payload number",
    }
}

/// 32-bit IPv4-style address. Also used for subnet masks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IpAddress(u32);

impl IpAddress {
    pub const UNSPECIFIED: IpAddress = IpAddress(0);

    pub fn new(a: u8, b: u8, c: u8, d: u8) -> IpAddress {
        IpAddress(u32::from_be_bytes([a, b, c, d]))
    }

    pub fn from_raw(raw: u32) -> IpAddress {
        IpAddress(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// The 32 address bits, MSB first.
    pub fn bits(self) -> Vec<Bit> {
        bits::bits_from_int(u64::from(self.0), 32)
    }

    pub fn from_bits(bits: &[Bit]) -> Option<IpAddress> {
        if bits.len() != 32 {
            return None;
        }
        Some(IpAddress(bits::bits_to_int(bits) as u32))
    }

    /// Parse dotted-quad notation. `None` on any malformed input.
    pub fn parse(text: &str) -> Option<IpAddress> {
        let mut octets = [0u8; 4];
        let mut count = 0;
        for part in text.split('.') {
            if count == 4 || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            octets[count] = part.parse().ok()?;
            count += 1;
        }
        if count != 4 {
            return None;
        }
        Some(IpAddress::new(octets[0], octets[1], octets[2], octets[3]))
    }

    /// True if this address lies in `subnet` under `mask`.
    pub fn in_subnet(self, subnet: IpAddress, mask: IpAddress) -> bool {
        self.0 & mask.0 == subnet.0
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// An IP packet: addresses, TTL, protocol and a byte-aligned payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IpPacket {
    pub dest: IpAddress,
    pub src: IpAddress,
    pub ttl: u8,
    pub protocol: u8,
    pub payload: Vec<Bit>,
}

impl IpPacket {
    pub fn new(dest: IpAddress, src: IpAddress, protocol: u8, payload: Vec<Bit>) -> IpPacket {
        IpPacket {
            dest,
            src,
            ttl: 0,
            protocol,
            payload,
        }
    }

    /// ICMP echo request.
    pub fn echo_request(dest: IpAddress, src: IpAddress) -> IpPacket {
        IpPacket::new(dest, src, 1, bits::bits_from_int(ICMP_ECHO_REQUEST, 8))
    }

    /// ICMP echo reply.
    pub fn echo_reply(dest: IpAddress, src: IpAddress) -> IpPacket {
        IpPacket::new(dest, src, 1, bits::bits_from_int(ICMP_ECHO_REPLY, 8))
    }

    /// ICMP destination-host-unreachable.
    pub fn dest_unreachable(dest: IpAddress, src: IpAddress) -> IpPacket {
        IpPacket::new(dest, src, 1, bits::bits_from_int(ICMP_DEST_UNREACHABLE, 8))
    }

    /// Serialize: dest, src, TTL, protocol, payload byte count, payload.
    pub fn bit_data(&self) -> Vec<Bit> {
        let mut out = Vec::with_capacity(88 + self.payload.len());
        out.extend(self.dest.bits());
        out.extend(self.src.bits());
        out.extend(bits::bits_from_int(u64::from(self.ttl), 8));
        out.extend(bits::bits_from_int(u64::from(self.protocol), 8));
        out.extend(bits::data_size(&self.payload));
        out.extend(bits::extend_to_byte_divisor(self.payload.clone(), true));
        out
    }

    /// Parse a packet from bits. `None` if the header or payload is short.
    pub fn parse(data: &[Bit]) -> Option<IpPacket> {
        if data.len() < 88 {
            return None;
        }
        let dest = IpAddress::from_bits(&data[0..32])?;
        let src = IpAddress::from_bits(&data[32..64])?;
        let ttl = bits::bits_to_int(&data[64..72]) as u8;
        let protocol = bits::bits_to_int(&data[72..80]) as u8;
        let payload_bytes = bits::bits_to_int(&data[80..88]) as usize;
        let total = 88 + payload_bytes * 8;
        if data.len() < total {
            return None;
        }
        Some(IpPacket {
            dest,
            src,
            ttl,
            protocol,
            payload: data[88..total].to_vec(),
        })
    }

    /// Decoded ICMP message, for protocol-1 packets only.
    pub fn icmp_message(&self) -> Option<&'static str> {
        if self.protocol != 1 {
            return None;
        }
        Some(icmp_payload_message(bits::bits_to_int(&self.payload)))
    }
}

impl fmt::Display for IpPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.src,
            self.dest,
            bits::bits_to_hex(&self.payload)
        )
    }
}
