//! SysV shared memory segment holding one `WindowRecord`.

use std::io;
use std::mem::size_of;
use std::ptr::{self, NonNull};

use libc::{IPC_CREAT, c_int, c_void, key_t};
use tracing::debug;

use crate::record::WindowRecord;

/// Size of every window segment.
pub const SEGMENT_SIZE: usize = size_of::<WindowRecord>();

/// Identifier of a shared memory segment.
///
/// Holding a `Segment` does not keep anything mapped; call `attach` for the
/// duration of each access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    id: c_int,
}

impl Segment {
    /// Create the segment for `key`, or open it if it already exists.
    ///
    /// A new segment is zero-filled by the kernel, which reads as an
    /// uninitialized record (capacity 0). Fails with `EINVAL` if a segment
    /// exists under `key` but is smaller than a `WindowRecord`.
    #[allow(unsafe_code)]
    pub fn create_or_open(key: key_t, mode: c_int) -> io::Result<Self> {
        let id = unsafe { libc::shmget(key, SEGMENT_SIZE, IPC_CREAT | mode) };
        if id == -1 {
            return Err(io::Error::last_os_error());
        }

        debug!(key, id, size = SEGMENT_SIZE, "Opened shared memory segment");
        Ok(Self { id })
    }

    /// Open an existing segment without creating it.
    ///
    /// Fails with `ENOENT` if the segment has been removed.
    #[allow(unsafe_code)]
    pub fn open(key: key_t, mode: c_int) -> io::Result<Self> {
        let id = unsafe { libc::shmget(key, SEGMENT_SIZE, mode) };
        if id == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { id })
    }

    /// Map the segment into this process.
    #[allow(unsafe_code)]
    pub fn attach(&self) -> io::Result<Attachment> {
        let raw = unsafe { libc::shmat(self.id, ptr::null(), 0) };
        if raw as isize == -1 {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(raw.cast::<WindowRecord>())
            .ok_or_else(|| io::Error::other("shmat returned a null mapping"))?;
        Ok(Attachment { ptr })
    }

    /// SysV segment identifier.
    pub const fn id(&self) -> c_int {
        self.id
    }
}

/// A mapping of a window segment, detached on drop.
///
/// The record is shared with other processes. Readers and writers must hold
/// the window's `SemaphoreGuard` while using it.
pub struct Attachment {
    ptr: NonNull<WindowRecord>,
}

impl Attachment {
    /// The mapped record.
    #[allow(unsafe_code)]
    pub fn record(&self) -> &WindowRecord {
        // SAFETY: the mapping is SEGMENT_SIZE bytes, page aligned and stays
        // valid until `self` is dropped. WindowRecord is plain integers, so
        // every bit pattern is a valid value.
        unsafe { self.ptr.as_ref() }
    }

    /// The mapped record, mutably.
    #[allow(unsafe_code)]
    pub fn record_mut(&mut self) -> &mut WindowRecord {
        // SAFETY: as in `record`; exclusivity against other processes comes
        // from the semaphore held by the caller.
        unsafe { self.ptr.as_mut() }
    }
}

impl Drop for Attachment {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // Detaching never removes the segment; it persists until IPC_RMID.
        if unsafe { libc::shmdt(self.ptr.as_ptr().cast::<c_void>()) } == -1 {
            debug!(error = %io::Error::last_os_error(), "shmdt failed");
        }
    }
}
