//! Configuration types for the in-memory driver

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Simulated process identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
    pub ppid: u32,
    pub pagesize: usize,
    /// Generated as `fs-<uuid>` when absent
    pub hostname: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            uid: 501,
            gid: 20,
            pid: 18012,
            ppid: 18009,
            pagesize: 4096,
            hostname: None,
        }
    }
}

/// 4 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1 << 32;

/// Main simulator configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub identity: IdentityConfig,
    /// Directory that exists from construction and is reported by `temp_dir`
    pub temp_dir: String,
    /// Initial environment table
    pub env: BTreeMap<String, String>,
    /// Largest size a regular file may grow to
    pub max_file_size: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            temp_dir: "/tmp".to_string(),
            env: BTreeMap::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl SimConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
