//! Simulated process identity

use uuid::Uuid;

use crate::config::IdentityConfig;

/// uid/gid/pid/ppid/pagesize/hostname of the simulated process.
///
/// Fixed at construction; readers need no lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
    pub ppid: u32,
    pub pagesize: usize,
    pub hostname: String,
}

impl Identity {
    pub fn from_config(config: &IdentityConfig) -> Self {
        let hostname = config
            .hostname
            .clone()
            .unwrap_or_else(|| format!("fs-{}", Uuid::new_v4().simple()));
        Self {
            uid: config.uid,
            gid: config.gid,
            pid: config.pid,
            ppid: config.ppid,
            pagesize: config.pagesize,
            hostname,
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::from_config(&IdentityConfig::default())
    }
}
