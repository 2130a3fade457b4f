//! Configuration for sliding windows

use serde::{Deserialize, Serialize};

use crate::{CAP_MAX, DEFAULT_PERMISSIONS};

/// Configuration shared by all handles a process opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// SysV permission bits for the segment and the semaphore
    pub permissions: u32,

    /// Capacity used when `max_size` is not given
    pub default_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            permissions: DEFAULT_PERMISSIONS,
            default_capacity: CAP_MAX,
        }
    }
}

impl WindowConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the permission bits (only the low nine bits are used)
    #[must_use]
    pub const fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions & 0o777;
        self
    }

    /// Set the capacity used when `max_size` is not given
    #[must_use]
    pub const fn with_default_capacity(mut self, capacity: usize) -> Self {
        self.default_capacity = capacity;
        self
    }

    /// Permission bits as passed to `shmget`/`semget`
    pub(crate) const fn mode(&self) -> libc::c_int {
        (self.permissions & 0o777) as libc::c_int
    }
}
