//! Script parser: one instruction per line, collected and sorted by time.

use core::fmt;

use netsim::bits::{self, Bit};
use netsim::instruction::{Instruction, Op};
use netsim::link::MacAddr;
use netsim::net::{IpAddress, Route};

/// `ping` schedules this many echo requests...
const PING_COUNT: u64 = 4;
/// ...this many milliseconds apart.
const PING_INTERVAL: u64 = 100;

/// A malformed script line.
#[derive(Debug)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse a whole script.
///
/// Empty lines and lines starting with `#` or a space are ignored. The
/// result is sorted by time, stably, so same-tick instructions keep their
/// order in the file.
pub fn parse_script(text: &str) -> Result<Vec<Instruction>, ScriptError> {
    let mut instructions = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.is_empty() || line.starts_with('#') || line.starts_with(' ') {
            continue;
        }
        parse_line(line, &mut instructions).map_err(|message| ScriptError {
            line: i + 1,
            message,
        })?;
    }
    instructions.sort_by_key(|inst| inst.time);
    Ok(instructions)
}

fn parse_line(line: &str, out: &mut Vec<Instruction>) -> Result<(), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let time: u64 = next(&tokens, 0, "time")?
        .parse()
        .map_err(|_| format!("invalid time {:?}", tokens[0]))?;

    match next(&tokens, 1, "instruction")? {
        "create" => {
            let kind = next(&tokens, 2, "device type")?;
            let name = next(&tokens, 3, "device name")?.to_string();
            let op = match kind {
                "host" => Op::CreateHost { name },
                "hub" => Op::CreateHub {
                    name,
                    ports: parse_ports(&tokens, 4)?,
                },
                "switch" => Op::CreateSwitch {
                    name,
                    ports: parse_ports(&tokens, 4)?,
                },
                "router" => Op::CreateRouter {
                    name,
                    ports: parse_ports(&tokens, 4)?,
                },
                other => return Err(format!("unknown device type {other:?}")),
            };
            out.push(Instruction::new(time, op));
        }
        "connect" => {
            out.push(Instruction::new(
                time,
                Op::Connect {
                    port_a: next(&tokens, 2, "first port")?.to_string(),
                    port_b: next(&tokens, 3, "second port")?.to_string(),
                },
            ));
        }
        "disconnect" => {
            out.push(Instruction::new(
                time,
                Op::Disconnect {
                    port: next(&tokens, 2, "port")?.to_string(),
                },
            ));
        }
        "mac" => {
            let (device, interface) = device_and_interface(next(&tokens, 2, "device")?)?;
            let mac = parse_mac(next(&tokens, 3, "MAC address")?)?;
            out.push(Instruction::new(
                time,
                Op::SetMac {
                    device,
                    interface,
                    mac,
                },
            ));
        }
        "ip" => {
            let (device, interface) = device_and_interface(next(&tokens, 2, "device")?)?;
            let ip = parse_ip(next(&tokens, 3, "IP address")?)?;
            let mask = parse_ip(next(&tokens, 4, "subnet mask")?)?;
            out.push(Instruction::new(
                time,
                Op::SetIp {
                    device,
                    interface,
                    ip,
                    mask,
                },
            ));
        }
        "send" => {
            let device = next(&tokens, 2, "device")?.to_string();
            let data = parse_bitstring(next(&tokens, 3, "bit string")?)?;
            out.push(Instruction::new(time, Op::Send { device, data }));
        }
        "send_frame" => {
            let device = next(&tokens, 2, "device")?.to_string();
            let dest = parse_mac(next(&tokens, 3, "destination MAC")?)?;
            let data = parse_hex16(next(&tokens, 4, "payload")?)?;
            out.push(Instruction::new(time, Op::SendFrame { device, dest, data }));
        }
        "send_packet" => {
            let device = next(&tokens, 2, "device")?.to_string();
            let dest = parse_ip(next(&tokens, 3, "destination IP")?)?;
            let data = parse_hex16(next(&tokens, 4, "payload")?)?;
            out.push(Instruction::new(
                time,
                Op::SendPacket { device, dest, data },
            ));
        }
        "ping" => {
            let device = next(&tokens, 2, "device")?.to_string();
            let dest = parse_ip(next(&tokens, 3, "destination IP")?)?;
            for i in 0..PING_COUNT {
                out.push(Instruction::new(
                    time + i * PING_INTERVAL,
                    Op::Ping {
                        device: device.clone(),
                        dest,
                    },
                ));
            }
        }
        "route" => {
            let op = match next(&tokens, 2, "route operation")? {
                "reset" => Op::RouteReset {
                    device: next(&tokens, 3, "device")?.to_string(),
                },
                verb @ ("add" | "remove") => {
                    let device = next(&tokens, 3, "device")?.to_string();
                    let route = Route::new(
                        parse_ip(next(&tokens, 4, "destination")?)?,
                        parse_ip(next(&tokens, 5, "mask")?)?,
                        parse_ip(next(&tokens, 6, "gateway")?)?,
                        parse_ports(&tokens, 7)?,
                    );
                    if verb == "add" {
                        Op::RouteAdd { device, route }
                    } else {
                        Op::RouteRemove { device, route }
                    }
                }
                other => return Err(format!("unknown route operation {other:?}")),
            };
            out.push(Instruction::new(time, op));
        }
        other => return Err(format!("unknown instruction {other:?}")),
    }
    Ok(())
}

fn next<'a>(tokens: &[&'a str], index: usize, what: &str) -> Result<&'a str, String> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| format!("missing {what}"))
}

fn parse_ports(tokens: &[&str], index: usize) -> Result<usize, String> {
    let text = next(tokens, index, "port count")?;
    match text.parse() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("invalid port count {text:?}")),
    }
}

/// `NAME` or `NAME:IFACE`; the interface defaults to 1.
fn device_and_interface(token: &str) -> Result<(String, usize), String> {
    match token.split_once(':') {
        None => Ok((token.to_string(), 1)),
        Some((name, iface)) => {
            let interface = iface
                .parse()
                .map_err(|_| format!("invalid interface {iface:?}"))?;
            Ok((name.to_string(), interface))
        }
    }
}

fn parse_mac(text: &str) -> Result<MacAddr, String> {
    MacAddr::parse(text).ok_or_else(|| format!("invalid MAC address {text:?}"))
}

fn parse_ip(text: &str) -> Result<IpAddress, String> {
    IpAddress::parse(text).ok_or_else(|| format!("invalid IP address {text:?}"))
}

fn parse_bitstring(text: &str) -> Result<Vec<Bit>, String> {
    text.chars()
        .map(|c| match c {
            '0' => Ok(Bit::Zero),
            '1' => Ok(Bit::One),
            _ => Err(format!("invalid bit {c:?}")),
        })
        .collect()
}

/// A 16-bit payload given as up to four hex digits.
fn parse_hex16(text: &str) -> Result<Vec<Bit>, String> {
    if text.is_empty() || text.len() > 4 {
        return Err(format!("invalid payload {text:?}"));
    }
    let value = u16::from_str_radix(text, 16).map_err(|_| format!("invalid payload {text:?}"))?;
    Ok(bits::bits_from_int(u64::from(value), 16))
}
