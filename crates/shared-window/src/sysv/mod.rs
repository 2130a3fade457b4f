//! SysV IPC primitives backing a window.
//!
//! Both resources are addressed by the same `key_t`; segments and semaphores
//! live in separate id namespaces, so they do not collide.
//!
//! - `segment`: `shmget` / `shmat` / `shmdt`, one segment holding one
//!   `WindowRecord`
//! - `semaphore`: a single semaphore used as a cross-process mutex
//!
//! Neither resource is removed when a handle or process goes away. They
//! persist until an operator removes them (`ipcrm`) or the system reboots.
//! Both types return plain `io::Error`s; the window handle adds the name and
//! key.

pub mod semaphore;
pub mod segment;

pub use semaphore::{Semaphore, SemaphoreGuard};
pub use segment::{Attachment, Segment};
