//! SysV semaphore used as a cross-process mutex.
//!
//! The semaphore value is the number of holders: 0 is unlocked, 1 is locked.
//! Locking is one atomic `semop` with two operations, "wait for zero" followed
//! by "+1", so the kernel never lets two callers through. A semaphore fresh
//! from `semget` is 0 and therefore already unlocked; there is no separate
//! initialization step to race on.
//!
//! Both the increment and the decrement carry `SEM_UNDO`. If a process dies
//! while holding the lock the kernel reverts its adjustment, which releases
//! the lock for the next waiter.
//!
//! Acquisition blocks without a timeout and makes no fairness promises beyond
//! what the kernel provides.

use std::io;

use libc::{IPC_CREAT, SEM_UNDO, c_int, c_short, key_t, sembuf};
use tracing::{debug, error};

const fn op(sem_op: c_short, undo: bool) -> sembuf {
    sembuf {
        sem_num: 0,
        sem_op,
        sem_flg: if undo { SEM_UNDO as c_short } else { 0 },
    }
}

/// Identifier of a single-semaphore set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semaphore {
    id: c_int,
}

impl Semaphore {
    /// Create the semaphore for `key`, or open it if it already exists.
    #[allow(unsafe_code)]
    pub fn create_or_open(key: key_t, mode: c_int) -> io::Result<Self> {
        let id = unsafe { libc::semget(key, 1, IPC_CREAT | mode) };
        if id == -1 {
            return Err(io::Error::last_os_error());
        }

        debug!(key, id, "Opened semaphore");
        Ok(Self { id })
    }

    /// Block until the lock is free, then take it.
    pub fn lock(&self) -> io::Result<SemaphoreGuard<'_>> {
        self.semop(&mut [op(0, false), op(1, true)])?;
        Ok(SemaphoreGuard { semaphore: self })
    }

    fn unlock(&self) -> io::Result<()> {
        self.semop(&mut [op(-1, true)])
    }

    /// Run `semop`, restarting when a signal interrupts the wait.
    #[allow(unsafe_code)]
    fn semop(&self, ops: &mut [sembuf]) -> io::Result<()> {
        loop {
            if unsafe { libc::semop(self.id, ops.as_mut_ptr(), ops.len()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    /// SysV semaphore set identifier.
    pub const fn id(&self) -> c_int {
        self.id
    }
}

/// Holds the lock until dropped.
///
/// Dropping releases the lock on every path out of a critical section,
/// including `?` returns and unwinding panics.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SemaphoreGuard<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.semaphore.unlock() {
            // Only possible if the semaphore was removed while held.
            error!(id = self.semaphore.id, error = %e, "Failed to release semaphore");
        }
    }
}
