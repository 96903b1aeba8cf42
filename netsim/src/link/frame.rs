//! Data-link frames and MAC addresses.

use core::fmt;

use rand::Rng;
use rand_xorshift::XorShiftRng;

use crate::bits::{self, Bit};
use crate::config::ErrorDetection;
use crate::link::error_detection;
use crate::net::{IpAddress, IpPacket};

/// 16-bit MAC address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MacAddr(pub u16);

impl MacAddr {
    /// All-ones broadcast address.
    pub const BROADCAST: MacAddr = MacAddr(0xFFFF);

    pub fn is_broadcast(self) -> bool {
        self == MacAddr::BROADCAST
    }

    /// The 16 address bits, MSB first.
    pub fn bits(self) -> Vec<Bit> {
        bits::bits_from_int(u64::from(self.0), 16)
    }

    pub fn from_bits(bits: &[Bit]) -> MacAddr {
        MacAddr(bits::bits_to_int(bits) as u16)
    }

    /// Parse up to four hex digits.
    pub fn parse(text: &str) -> Option<MacAddr> {
        if text.is_empty() || text.len() > 4 {
            return None;
        }
        u16::from_str_radix(text, 16).ok().map(MacAddr)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// A parsed data-link frame.
///
/// Layout, MSB first per field: 16-bit destination MAC, 16-bit source MAC,
/// 8-bit payload byte count, 8-bit trailer byte count, payload, trailer.
#[derive(Clone, Debug)]
pub struct Frame {
    pub dest: MacAddr,
    pub src: MacAddr,
    pub payload: Vec<Bit>,
    pub trailer: Vec<Bit>,
    /// The complete frame as transmitted, including any corruption.
    pub bits: Vec<Bit>,
}

impl Frame {
    /// Try to parse a frame from the front of a receive buffer.
    ///
    /// Returns `None` until the buffer holds the full header plus the
    /// payload and trailer lengths the header announces.
    pub fn parse(data: &[Bit]) -> Option<Frame> {
        if data.len() < 48 {
            return None;
        }
        let payload_bits = bits::bits_to_int(&data[32..40]) as usize * 8;
        let trailer_bits = bits::bits_to_int(&data[40..48]) as usize * 8;
        if data.len() - 48 < payload_bits + trailer_bits {
            return None;
        }
        let payload_end = 48 + payload_bits;
        Some(Frame {
            dest: MacAddr::from_bits(&data[0..16]),
            src: MacAddr::from_bits(&data[16..32]),
            payload: data[48..payload_end].to_vec(),
            trailer: data[payload_end..payload_end + trailer_bits].to_vec(),
            bits: data.to_vec(),
        })
    }

    /// Assemble a frame around a payload.
    ///
    /// The payload is padded to a byte boundary and the integrity trailer is
    /// computed first; with probability `error_prob` one payload bit is then
    /// flipped, so the corruption is detectable on the receiving side.
    pub fn build(
        dest: MacAddr,
        src: MacAddr,
        payload: Vec<Bit>,
        detection: ErrorDetection,
        error_prob: f64,
        rng: &mut XorShiftRng,
    ) -> Frame {
        let mut payload = bits::extend_to_byte_divisor(payload, true);
        let (trailer_size, trailer) = error_detection::error_detection_data(&payload, detection);

        if !payload.is_empty() && rng.gen::<f64>() < error_prob {
            let i = rng.gen_range(0..payload.len());
            payload[i] = payload[i].flipped();
        }

        let mut frame_bits = Vec::with_capacity(48 + payload.len() + trailer.len());
        frame_bits.extend(dest.bits());
        frame_bits.extend(src.bits());
        frame_bits.extend(bits::data_size(&payload));
        frame_bits.extend(trailer_size);
        frame_bits.extend(&payload);
        frame_bits.extend(&trailer);

        Frame {
            dest,
            src,
            payload,
            trailer,
            bits: frame_bits,
        }
    }

    /// If the payload is an ARP message, the IP it carries.
    ///
    /// ARP messages are exactly eight bytes: ASCII `ARPQ` followed by a
    /// 32-bit address. Whether it is a query or a reply is decided by the
    /// destination MAC (broadcast = query).
    pub fn arp_payload(&self) -> Option<IpAddress> {
        if self.payload.len() != 64 {
            return None;
        }
        if self.payload[0..32] != bits::ascii_to_bits("ARPQ") {
            return None;
        }
        IpAddress::from_bits(&self.payload[32..64])
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = match IpPacket::parse(&self.payload) {
            Some(packet) => packet.to_string(),
            None => bits::bits_to_hex(&self.payload),
        };
        let note = match self.arp_payload() {
            Some(ip) if self.dest.is_broadcast() => format!(" | (ARPQ) Who is {ip} ?"),
            Some(_) => " | (ARPQ) response".to_string(),
            None => String::new(),
        };
        write!(f, "{} -> {} | {}{}", self.src, self.dest, data, note)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::link::error_detection::frame_has_errors;

    fn rng() -> XorShiftRng {
        XorShiftRng::from_seed([3; 16])
    }

    #[test]
    fn build_then_parse_preserves_fields() {
        let frame = Frame::build(
            MacAddr(0x0002),
            MacAddr(0x0001),
            bits::bits_from_int(0xABCD, 16),
            ErrorDetection::SimpleHash,
            0.0,
            &mut rng(),
        );
        assert_eq!(frame.dest, MacAddr(0x0002));
        assert_eq!(frame.src, MacAddr(0x0001));
        assert_eq!(bits::bits_to_hex(&frame.payload), "ABCD");
        assert_eq!(frame.bits.len(), 72);
        assert!(!frame_has_errors(&frame.bits, ErrorDetection::SimpleHash));
    }

    #[test]
    fn parse_needs_the_complete_frame() {
        let frame = Frame::build(
            MacAddr(0x0002),
            MacAddr(0x0001),
            bits::bits_from_int(0xAA, 8),
            ErrorDetection::SimpleHash,
            0.0,
            &mut rng(),
        );
        for len in 0..frame.bits.len() {
            assert!(Frame::parse(&frame.bits[..len]).is_none());
        }
        assert!(Frame::parse(&frame.bits).is_some());
    }

    #[test]
    fn forced_corruption_is_detected() {
        let frame = Frame::build(
            MacAddr(0x0002),
            MacAddr(0x0001),
            bits::bits_from_int(0xABCD, 16),
            ErrorDetection::SimpleHash,
            1.0,
            &mut rng(),
        );
        assert!(frame_has_errors(&frame.bits, ErrorDetection::SimpleHash));
    }

    #[test]
    fn arp_payload_detection() {
        let ip = IpAddress::new(10, 0, 0, 2);
        let mut payload = bits::ascii_to_bits("ARPQ");
        payload.extend(ip.bits());
        let frame = Frame::build(
            MacAddr::BROADCAST,
            MacAddr(0x0001),
            payload,
            ErrorDetection::SimpleHash,
            0.0,
            &mut rng(),
        );
        assert_eq!(frame.arp_payload(), Some(ip));

        let other = Frame::build(
            MacAddr::BROADCAST,
            MacAddr(0x0001),
            bits::bits_from_int(0xABCD, 16),
            ErrorDetection::SimpleHash,
            0.0,
            &mut rng(),
        );
        assert_eq!(other.arp_payload(), None);
    }
}
