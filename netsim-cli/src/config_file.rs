//! `config.txt` reader.
//!
//! Whitespace-separated `key value` lines. A missing file is created with
//! the defaults so a fresh checkout runs out of the box. Unknown keys are
//! ignored; malformed values are fatal.

use core::fmt;
use std::fs;
use std::io;
use std::path::Path;

use netsim::config::{ErrorDetection, SimConfig};

/// A config file that could not be read or understood.
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: String) -> ConfigError {
        ConfigError { message }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> ConfigError {
        ConfigError::new(err.to_string())
    }
}

/// Load the configuration, writing a default file if none exists.
pub fn load_or_create(path: &Path) -> Result<SimConfig, ConfigError> {
    if !path.exists() {
        let defaults = SimConfig::default();
        fs::write(path, render(&defaults))?;
        return Ok(defaults);
    }

    let mut cfg = SimConfig::default();
    for line in fs::read_to_string(path)?.lines() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            continue;
        };
        let value = parts
            .next()
            .ok_or_else(|| ConfigError::new(format!("{key}: missing value")))?;
        match key {
            "signal_time" => {
                cfg.signal_time = value
                    .parse()
                    .ok()
                    .filter(|&v| v >= 1)
                    .ok_or_else(|| ConfigError::new(format!("invalid signal_time {value:?}")))?;
            }
            "error_detection" => {
                cfg.error_detection = ErrorDetection::from_name(value).ok_or_else(|| {
                    ConfigError::new(format!("unknown error_detection algorithm {value:?}"))
                })?;
            }
            "error_prob" => {
                cfg.error_prob = value
                    .parse()
                    .ok()
                    .filter(|p| (0.0..=1.0).contains(p))
                    .ok_or_else(|| ConfigError::new(format!("invalid error_prob {value:?}")))?;
            }
            "seed" => {
                cfg.seed = value
                    .parse()
                    .map_err(|_| ConfigError::new(format!("invalid seed {value:?}")))?;
            }
            _ => {}
        }
    }
    Ok(cfg)
}

fn render(cfg: &SimConfig) -> String {
    format!(
        "signal_time {}\nerror_detection {}\nerror_prob {}\nseed {}\n",
        cfg.signal_time, cfg.error_detection, cfg.error_prob, cfg.seed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("netsim-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = scratch("fresh.txt");
        let _ = fs::remove_file(&path);
        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg.signal_time, 10);
        assert!(path.exists());
        // A second load reads the file just written.
        let again = load_or_create(&path).unwrap();
        assert_eq!(again.signal_time, cfg.signal_time);
    }

    #[test]
    fn values_override_defaults_and_unknown_keys_are_ignored() {
        let path = scratch("custom.txt");
        fs::write(&path, "signal_time 4\nerror_prob 0\nwibble 3\nseed 42\n").unwrap();
        let cfg = load_or_create(&path).unwrap();
        assert_eq!(cfg.signal_time, 4);
        assert_eq!(cfg.error_prob, 0.0);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn bad_values_are_fatal() {
        let path = scratch("broken.txt");
        fs::write(&path, "signal_time zero\n").unwrap();
        assert!(load_or_create(&path).is_err());

        fs::write(&path, "error_detection crc32\n").unwrap();
        assert!(load_or_create(&path).is_err());

        fs::write(&path, "error_prob 2.0\n").unwrap();
        assert!(load_or_create(&path).is_err());
    }
}
