//! Per-process handle to a shared sliding window.
//!
//! A `SlidingWindow` stores only what is needed to find the window again: its
//! name, the derived key and the semaphore id. Every operation re-opens and
//! attaches the segment, takes the semaphore, works on the record and then
//! releases both, so handles are cheap to clone around and hold no mapping
//! between calls.

use libc::{c_int, key_t};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::capacity::MaxSize;
use crate::config::WindowConfig;
use crate::error::{Result, WindowError};
use crate::key::{derive_key, ipc_key};
use crate::record::{NonMonotonic, WindowRecord};
use crate::sysv::{Segment, Semaphore};

/// Handle to a window shared between processes.
///
/// Handles created from the same name, in this process or any other, observe
/// the same samples.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    name: String,
    key: u64,
    ipc_key: key_t,
    mode: c_int,
    semaphore: Semaphore,
    capacity_coerced: bool,
}

/// Consistent view of a window, read in one critical section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSnapshot {
    /// Window name
    pub name: String,
    /// Derived resource key
    pub key: u64,
    /// Maximum number of samples
    pub capacity: usize,
    /// Number of live samples
    pub length: usize,
    /// Physical index of the oldest sample
    pub start: usize,
    /// Physical index of the next write
    pub end: usize,
    /// Live samples, oldest first
    pub values: Vec<i32>,
}

impl SlidingWindow {
    /// Create the window for `name` with the default configuration.
    ///
    /// See [`create_or_open_with`](Self::create_or_open_with).
    pub fn create_or_open(name: &str, max_size: impl Into<MaxSize>) -> Result<Self> {
        Self::create_or_open_with(name, max_size, &WindowConfig::default())
    }

    /// Create the window for `name`, or open it if it exists, and reset it.
    ///
    /// The reset is unconditional: samples pushed by other processes under the
    /// same name are discarded and the capacity is overwritten. Processes that
    /// join an existing window should use [`attach`](Self::attach) instead.
    pub fn create_or_open_with(
        name: &str,
        max_size: impl Into<MaxSize>,
        config: &WindowConfig,
    ) -> Result<Self> {
        check_name(name)?;
        let checked = max_size.into().check(name, config.default_capacity)?;
        if checked.coerced {
            warn!(
                window = name,
                capacity = checked.capacity,
                "max_size is a float, converting to integer"
            );
        }

        let key = derive_key(name);
        let ipc_key = ipc_key(key);
        let mode = config.mode();

        let segment = Segment::create_or_open(ipc_key, mode).map_err(|source| {
            WindowError::Resource {
                name: name.to_string(),
                key,
                operation: "create shared memory",
                source,
            }
        })?;
        let semaphore = Semaphore::create_or_open(ipc_key, mode).map_err(|source| {
            WindowError::Resource {
                name: name.to_string(),
                key,
                operation: "create semaphore",
                source,
            }
        })?;

        let window = Self {
            name: name.to_string(),
            key,
            ipc_key,
            mode,
            semaphore,
            capacity_coerced: checked.coerced,
        };

        {
            let _guard = window.lock()?;
            let mut attachment = segment
                .attach()
                .map_err(|source| window.resource("attach shared memory", source))?;
            let record = attachment.record_mut();
            if record.is_initialized() && !record.is_empty() {
                warn!(
                    window = name,
                    key,
                    length = record.len(),
                    "Resetting a populated window; samples from other processes are discarded"
                );
            }
            record.initialize(checked.capacity);
        }

        debug!(window = name, key, capacity = checked.capacity, "Initialized window");
        Ok(window)
    }

    /// Open an existing window without resetting it.
    pub fn attach(name: &str) -> Result<Self> {
        Self::attach_with(name, &WindowConfig::default())
    }

    /// Open an existing window without resetting it.
    ///
    /// Fails with `Uninitialized` if no process has created the window.
    pub fn attach_with(name: &str, config: &WindowConfig) -> Result<Self> {
        check_name(name)?;
        let key = derive_key(name);
        let ipc_key = ipc_key(key);
        let mode = config.mode();

        let segment = Segment::open(ipc_key, mode).map_err(|source| {
            if source.raw_os_error() == Some(libc::ENOENT) {
                WindowError::Uninitialized {
                    name: name.to_string(),
                    key,
                }
            } else {
                WindowError::Resource {
                    name: name.to_string(),
                    key,
                    operation: "open shared memory",
                    source,
                }
            }
        })?;
        let semaphore = Semaphore::create_or_open(ipc_key, mode).map_err(|source| {
            WindowError::Resource {
                name: name.to_string(),
                key,
                operation: "open semaphore",
                source,
            }
        })?;

        let window = Self {
            name: name.to_string(),
            key,
            ipc_key,
            mode,
            semaphore,
            capacity_coerced: false,
        };

        let capacity = {
            let _guard = window.lock()?;
            let attachment = segment
                .attach()
                .map_err(|source| window.resource("attach shared memory", source))?;
            let record = attachment.record();
            window.check(record)?;
            record.capacity()
        };

        debug!(window = name, key, capacity, "Attached window");
        Ok(window)
    }

    /// Window name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource key derived from the name.
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Whether `max_size` was a float that had to be truncated.
    ///
    /// Bindings surface this as a compatibility warning to their callers.
    pub const fn capacity_coerced(&self) -> bool {
        self.capacity_coerced
    }

    /// Number of live samples.
    pub fn size(&self) -> Result<usize> {
        self.with_record(|record| record.len())
    }

    /// Maximum number of samples.
    pub fn capacity(&self) -> Result<usize> {
        self.with_record(|record| record.capacity())
    }

    /// Most recent sample.
    ///
    /// Fails with `EmptyWindow` when there are no samples.
    pub fn last(&self) -> Result<i32> {
        self.with_record(|record| record.last())?
            .ok_or_else(|| WindowError::EmptyWindow {
                name: self.name.clone(),
            })
    }

    /// Live samples, oldest first.
    pub fn values(&self) -> Result<Vec<i32>> {
        self.with_record(|record| record.values())
    }

    /// Append a sample, evicting the oldest one if the window is full.
    pub fn push(&self, value: i32) -> Result<()> {
        self.with_record(|record| record.push(value))
    }

    /// Drop all samples. The capacity is kept and the OS resources stay.
    pub fn clear(&self) -> Result<()> {
        self.with_record(WindowRecord::clear)
    }

    /// Remove the oldest samples for which `predicate` returns true.
    ///
    /// Matches must form a contiguous prefix starting at the oldest sample.
    /// The first match past that prefix aborts with `NonMonotonicRemoval`;
    /// removals made before it stay applied and other processes will see the
    /// shortened window. See [`WindowRecord::reject_matching`] for the exact
    /// index arithmetic.
    ///
    /// Returns the number of samples removed.
    pub fn reject_matching<F>(&self, predicate: F) -> Result<usize>
    where
        F: FnMut(i32) -> bool,
    {
        let removed = self.with_record(|record| record.reject_matching(predicate))?;
        removed.map_err(|NonMonotonic { index, removed }| {
            warn!(
                window = %self.name,
                index,
                removed,
                "Non-monotonic reject left window partially trimmed"
            );
            WindowError::NonMonotonicRemoval {
                name: self.name.clone(),
                index,
                removed,
            }
        })
    }

    /// Read every counter and the samples in one critical section.
    pub fn snapshot(&self) -> Result<WindowSnapshot> {
        self.with_record(|record| WindowSnapshot {
            name: self.name.clone(),
            key: self.key,
            capacity: record.capacity(),
            length: record.len(),
            start: record.start(),
            end: record.end(),
            values: record.values(),
        })
    }

    /// Attach the segment and run `f` on the record while holding the lock.
    fn with_record<T>(&self, f: impl FnOnce(&mut WindowRecord) -> T) -> Result<T> {
        let segment = Segment::open(self.ipc_key, self.mode)
            .map_err(|source| self.resource("open shared memory", source))?;
        let _guard = self.lock()?;
        let mut attachment = segment
            .attach()
            .map_err(|source| self.resource("attach shared memory", source))?;

        let record = attachment.record_mut();
        self.check(record)?;
        trace!(
            window = %self.name,
            key = self.key,
            capacity = record.capacity(),
            length = record.len(),
            start = record.start(),
            end = record.end(),
            "Window attached"
        );
        Ok(f(record))
    }

    fn lock(&self) -> Result<crate::sysv::SemaphoreGuard<'_>> {
        self.semaphore
            .lock()
            .map_err(|source| self.resource("acquire semaphore", source))
    }

    fn check(&self, record: &WindowRecord) -> Result<()> {
        if !record.is_initialized() {
            return Err(WindowError::Uninitialized {
                name: self.name.clone(),
                key: self.key,
            });
        }
        record.check_bounds().map_err(|reason| WindowError::Corrupted {
            name: self.name.clone(),
            key: self.key,
            reason,
        })
    }

    fn resource(&self, operation: &'static str, source: std::io::Error) -> WindowError {
        WindowError::Resource {
            name: self.name.clone(),
            key: self.key,
            operation,
            source,
        }
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WindowError::invalid_argument(name, "name must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        let err = SlidingWindow::create_or_open("", 4).unwrap_err();
        assert!(matches!(err, WindowError::InvalidArgument { .. }));

        let err = SlidingWindow::attach("").unwrap_err();
        assert!(matches!(err, WindowError::InvalidArgument { .. }));
    }

    #[test]
    fn test_invalid_capacity_rejected_before_os_calls() {
        let name = format!("window-invalid-{}", std::process::id());
        for max_size in [MaxSize::Integer(0), MaxSize::Integer(crate::CAP_MAX as i64 + 1)] {
            let err = SlidingWindow::create_or_open(&name, max_size).unwrap_err();
            assert!(matches!(err, WindowError::InvalidArgument { .. }));
        }
        // Validation failed first, so nothing was created under the name.
        assert!(Segment::open(ipc_key(derive_key(&name)), 0o664).is_err());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = WindowSnapshot {
            name: "w".to_string(),
            key: 7,
            capacity: 4,
            length: 2,
            start: 1,
            end: 3,
            values: vec![10, 11],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["values"], serde_json::json!([10, 11]));
        assert_eq!(json["capacity"], 4);
    }
}
