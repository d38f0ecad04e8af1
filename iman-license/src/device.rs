//! Hardware fingerprinting for license binding.
//!
//! The fingerprint hashes the primary network adapter address, the host name
//! and the processor descriptor of this machine. It is stable across runs on
//! the same hardware. When any of those queries fails the fingerprint falls
//! back to a random value, so a license bound to this machine will not validate
//! for that run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 32;

/// Source of the machine identifiers that feed the fingerprint.
pub trait HardwareProbe {
    /// Primary network adapter address as a 48-bit node number.
    fn node_id(&self) -> Option<u64>;

    /// Host name of the machine.
    fn hostname(&self) -> Option<String>;

    /// Processor descriptor.
    fn processor(&self) -> Option<String>;
}

/// Queries the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HardwareProbe for SystemProbe {
    fn node_id(&self) -> Option<u64> {
        get_node_id()
    }

    fn hostname(&self) -> Option<String> {
        hostname::get().ok().and_then(|h| h.into_string().ok())
    }

    fn processor(&self) -> Option<String> {
        Some(get_processor().unwrap_or_else(|| std::env::consts::ARCH.to_string()))
    }
}

/// A fingerprint that identifies this machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareFingerprint(String);

impl HardwareFingerprint {
    /// Generates the fingerprint of the current machine.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_probe(&SystemProbe)
    }

    /// Derives a fingerprint from the identifiers reported by `probe`.
    #[must_use]
    pub fn from_probe(probe: &dyn HardwareProbe) -> Self {
        match (probe.node_id(), probe.hostname(), probe.processor()) {
            (Some(node), Some(host), Some(cpu)) => Self(truncated_digest(&format!("{node}-{host}-{cpu}"))),
            _ => {
                warn!("Hardware query failed, using a random fingerprint for this run");
                Self::random()
            }
        }
    }

    /// Returns a fingerprint derived from a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(truncated_digest(&uuid::Uuid::new_v4().to_string()))
    }

    /// Wraps an existing fingerprint ID, such as one read from a token.
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the fingerprint ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Returns true if `id` names this machine.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        self.0 == id
    }
}

impl fmt::Display for HardwareFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn truncated_digest(input: &str) -> String {
    let mut digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest.truncate(FINGERPRINT_LEN);
    digest
}

/// Parses a hardware address such as `aa:bb:cc:dd:ee:ff` or `AA-BB-CC-DD-EE-FF`
/// into its 48-bit node number.
#[must_use]
pub fn parse_mac(text: &str) -> Option<u64> {
    let octets: Vec<&str> = text.trim().split([':', '-']).collect();
    if octets.len() != 6 {
        return None;
    }
    octets.iter().try_fold(0u64, |acc, octet| {
        if octet.len() != 2 {
            return None;
        }
        u8::from_str_radix(octet, 16).ok().map(|b| (acc << 8) | u64::from(b))
    })
}

/// Gets the node number of the first non-loopback adapter.
fn get_node_id() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let mut names: Vec<_> = std::fs::read_dir("/sys/class/net")
            .ok()?
            .filter_map(Result::ok)
            .map(|e| e.file_name())
            .filter(|n| n != "lo")
            .collect();
        names.sort();
        names.into_iter().find_map(|name| {
            let path = std::path::Path::new("/sys/class/net").join(name).join("address");
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| parse_mac(&s))
                .filter(|&node| node != 0)
        })
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ifconfig")
            .arg("en0")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find_map(|l| l.trim().strip_prefix("ether "))
                    .and_then(parse_mac)
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("getmac")
            .args(["/fo", "csv", "/nh"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .filter_map(|l| l.split(',').next())
                    .find_map(|field| parse_mac(field.trim_matches('"')))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

/// Gets the processor descriptor (platform-specific).
fn get_processor() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split_once(':'))
                .map(|(_, v)| v.trim().to_string())
        })
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sysctl")
            .args(["-n", "machdep.cpu.brand_string"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("PROCESSOR_IDENTIFIER").ok()
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
