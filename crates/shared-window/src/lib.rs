//! Cross-process sliding window of integer samples.
//!
//! A fixed-capacity circular buffer lives in a SysV shared memory segment and
//! is guarded by a SysV semaphore used as a mutex. Any process that derives the
//! same key from the same window name sees the same buffer, which makes this
//! the building block for fleet-wide admission control: recent errors,
//! latencies or timestamps can be tracked across worker processes without a
//! central server.
//!
//! # Architecture
//!
//! - `key`: window name to numeric resource key
//! - `sysv`: segment attachment and the semaphore mutex
//! - `record`: the shared `WindowRecord` and its buffer algorithms
//! - `window`: the per-process `SlidingWindow` handle
//! - `capacity`: `max_size` argument validation
//! - `config`: permission bits and default capacity
//!
//! Every operation on a handle attaches the segment, takes the lock, reads or
//! mutates the record and releases the lock again.
//!
//! # Example
//!
//! ```no_run
//! use shared_window::SlidingWindow;
//!
//! # fn example() -> shared_window::Result<()> {
//! let window = SlidingWindow::create_or_open("payments.errors", 5)?;
//! for ts in [100, 101, 250, 251, 252] {
//!     window.push(ts)?;
//! }
//!
//! // Expire everything older than 200.
//! window.reject_matching(|ts| ts < 200)?;
//! assert_eq!(window.values()?, vec![250, 251, 252]);
//!
//! // Another process attaches without resetting the samples.
//! let other = SlidingWindow::attach("payments.errors")?;
//! assert_eq!(other.last()?, 252);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

#[cfg(not(unix))]
compile_error!("shared-window requires SysV IPC and only builds on unix targets");

pub mod capacity;
pub mod config;
pub mod error;
pub mod key;
pub mod record;
pub mod sysv;
pub mod window;

pub use capacity::{CapacityCheck, MaxSize};
pub use config::WindowConfig;
pub use error::{Result, WindowError};
pub use key::{derive_key, ipc_key};
pub use record::WindowRecord;
pub use window::{SlidingWindow, WindowSnapshot};

/// Largest capacity a window can be created with.
///
/// This is also the length of the `data` array in every `WindowRecord`, so it
/// fixes the size of the shared segment.
pub const CAP_MAX: usize = 1000;

/// Default SysV permission bits for new segments and semaphores.
pub const DEFAULT_PERMISSIONS: u32 = 0o664;

/// Version information for the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
