//! Per-device log tables, persisted at the end of a run.

use std::fs;
use std::io;
use std::path::Path;

/// Four-column event table: time, device, action, info.
pub struct EventLog {
    device: String,
    rows: Vec<String>,
}

impl EventLog {
    pub fn new(device: &str) -> EventLog {
        EventLog {
            device: device.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, time: u64, action: &str, info: &str) {
        self.rows
            .push(format!("| {:^10} | {:^12} | {:^14} | {:^30} |", time, self.device, action, info));
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Write `<dir>/<device>.txt`.
    pub fn save(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let header = format!(
            "| {:^10} | {:^12} | {:^14} | {:^30} |",
            "Time (ms)", "Device", "Action", "Info"
        );
        let rule = "-".repeat(header.len());
        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&header);
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&self.rows.join("\n"));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        fs::write(dir.join(format!("{}.txt", self.device)), out)
    }
}

/// Per-port traffic table with one `Rece . Sent` column pair per port.
pub struct TraceLog {
    device: String,
    ports: Vec<String>,
    rows: Vec<String>,
}

impl TraceLog {
    pub fn new(device: &str, ports: &[String]) -> TraceLog {
        TraceLog {
            device: device.to_string(),
            ports: ports.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Append a row of port snapshots; `-` marks a disconnected port.
    pub fn push(&mut self, time: u64, received: &[String], sent: &[String]) {
        let mut row = format!("| {time:^10} |");
        for (re, se) in received.iter().zip(sent) {
            if re == "-" {
                row.push_str(&format!(" {:^11} |", "---"));
            } else {
                row.push_str(&format!(" {re:>4} . {se:<4} |"));
            }
        }
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Write `<dir>/<device>.txt`.
    pub fn save(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let mut header = format!("| {:^10} |", "Time (ms)");
        for port in &self.ports {
            header.push_str(&format!(" {port:^11} |"));
        }
        let rule = "-".repeat(header.len());
        let mut subheader = format!("| {:^10} |", "");
        for _ in &self.ports {
            subheader.push_str(&format!(" {:^11} |", "Rece . Sent"));
        }
        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&header);
        out.push('\n');
        out.push_str(&subheader);
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&self.rows.join("\n"));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        fs::write(dir.join(format!("{}.txt", self.device)), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_rows_are_fixed_width() {
        let mut log = EventLog::new("H1");
        log.push(42, "Sent", "1");
        let row = &log.rows()[0];
        assert!(row.starts_with('|') && row.ends_with('|'));
        assert!(row.contains("Sent"));
    }

    #[test]
    fn trace_marks_disconnected_ports() {
        let mut log = TraceLog::new("HUB", &["HUB_1".into(), "HUB_2".into()]);
        log.push(5, &["1".into(), "-".into()], &["1".into(), "-".into()]);
        assert!(log.rows()[0].contains("---"));
        assert!(log.rows()[0].contains("1    "));
    }
}
