//! Machine fingerprinting for activation code binding.
//!
//! The fingerprint is a coarse hint, not a security boundary: it is derived
//! from readily spoofable host attributes and truncated to 32 bits.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::env;

/// Number of hex characters in a machine id.
pub const MACHINE_ID_HEX_LEN: usize = 8;

/// Source of the current machine id.
///
/// Verification goes through this trait so that binding can be checked
/// against a host other than the one running the process.
pub trait FingerprintSource: Send + Sync {
    /// Returns the machine id of the current host.
    fn current_id(&self) -> String;
}

/// Host attributes that make up the fingerprint.
///
/// The canonical form is a JSON object with keys in alphabetical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttributes {
    /// Machine architecture.
    pub machine: String,
    /// Host name.
    pub node: String,
    /// Platform name and release.
    pub platform: String,
    /// Processor description.
    pub processor: String,
}

impl HostAttributes {
    /// Collects attributes of the current host.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            machine: env::consts::ARCH.to_string(),
            node: get_hostname(),
            platform: format!("{}-{}", env::consts::OS, get_os_version()),
            processor: get_processor(),
        }
    }

    /// Derives the machine id from these attributes.
    #[must_use]
    pub fn machine_id(&self) -> String {
        let canonical = json!({
            "machine": self.machine,
            "node": self.node,
            "platform": self.platform,
            "processor": self.processor,
        })
        .to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        let mut id = hex::encode(digest);
        id.truncate(MACHINE_ID_HEX_LEN);
        id
    }
}

/// Fingerprint of the host the process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFingerprint;

impl FingerprintSource for HostFingerprint {
    fn current_id(&self) -> String {
        HostAttributes::collect().machine_id()
    }
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

fn get_os_version() -> String {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        "unknown".to_string()
    }
}

fn get_processor() -> String {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split_once(':'))
                    .map(|(_, v)| v.trim().to_string())
            })
            .unwrap_or_else(|| env::consts::ARCH.to_string())
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
            .unwrap_or_else(|| env::consts::ARCH.to_string())
    }

    #[cfg(target_os = "windows")]
    {
        env::var("PROCESSOR_IDENTIFIER").unwrap_or_else(|_| env::consts::ARCH.to_string())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        env::consts::ARCH.to_string()
    }
}
