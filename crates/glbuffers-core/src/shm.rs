//! Shared-memory backed device

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use shared_memory::{Shmem, ShmemConf};

use crate::device::{AccessHint, BufferApi, BufferKind, MappedRegion, UsageHint};
use crate::{Error, Result};

fn shm_error(e: impl ToString) -> Error {
    Error::Device {
        message: e.to_string(),
        retryable: false,
    }
}

struct Segment {
    // None until the first non-empty upload
    shmem: Option<Shmem>,
    size: usize,
    mapped: bool,
}

/// Device keeping buffer contents in named shared memory segments
///
/// Segments are named `<prefix>_buf_<handle>`, so a peer process can read a
/// buffer's packed records with [`ShmDevice::open_bytes`] while the owner
/// keeps it alive.
pub struct ShmDevice {
    prefix: String,
    segments: RefCell<HashMap<u32, Segment>>,
    next_handle: Cell<u32>,
}

impl ShmDevice {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            segments: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn segment_name(&self, handle: u32) -> String {
        format!("{}_buf_{}", self.prefix, handle)
    }

    /// Copy a peer's segment contents
    pub fn open_bytes(prefix: &str, handle: u32) -> Result<Vec<u8>> {
        let shmem = ShmemConf::new()
            .os_id(format!("{prefix}_buf_{handle}"))
            .open()
            .map_err(shm_error)?;
        let bytes = unsafe { std::slice::from_raw_parts(shmem.as_ptr(), shmem.len()) };
        Ok(bytes.to_vec())
    }
}

impl BufferApi for ShmDevice {
    fn allocate(&self, _kind: BufferKind) -> Result<u32> {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.segments.borrow_mut().insert(
            handle,
            Segment {
                shmem: None,
                size: 0,
                mapped: false,
            },
        );
        Ok(handle)
    }

    fn delete(&self, handle: u32) {
        self.segments.borrow_mut().remove(&handle);
    }

    fn is_valid(&self, handle: u32) -> bool {
        self.segments.borrow().contains_key(&handle)
    }

    fn upload(&self, handle: u32, bytes: &[u8], _usage: UsageHint) -> Result<()> {
        let name = self.segment_name(handle);
        let mut segments = self.segments.borrow_mut();
        let segment = segments
            .get_mut(&handle)
            .ok_or_else(|| shm_error(format!("unknown buffer handle {handle}")))?;
        if segment.mapped {
            return Err(Error::Device {
                message: format!("buffer {handle} is mapped"),
                retryable: true,
            });
        }

        // Drop (and unlink) the old segment before recreating at the new size
        segment.shmem = None;
        segment.size = 0;

        if !bytes.is_empty() {
            let shmem = ShmemConf::new()
                .size(bytes.len())
                .os_id(&name)
                .create()
                .map_err(shm_error)?;
            unsafe {
                std::slice::from_raw_parts_mut(shmem.as_ptr(), bytes.len()).copy_from_slice(bytes)
            };
            segment.size = bytes.len();
            segment.shmem = Some(shmem);
        }
        Ok(())
    }

    fn map(&self, handle: u32, _access: AccessHint) -> Result<MappedRegion> {
        let mut segments = self.segments.borrow_mut();
        let segment = segments
            .get_mut(&handle)
            .ok_or_else(|| shm_error(format!("unknown buffer handle {handle}")))?;
        if segment.mapped {
            return Err(Error::Device {
                message: format!("buffer {handle} is already mapped"),
                retryable: true,
            });
        }
        segment.mapped = true;
        let ptr = match &segment.shmem {
            Some(shmem) => shmem.as_ptr(),
            None => std::ptr::NonNull::<u8>::dangling().as_ptr(),
        };
        Ok(MappedRegion {
            ptr,
            len: segment.size,
        })
    }

    fn unmap(&self, handle: u32) -> Result<()> {
        let mut segments = self.segments.borrow_mut();
        let segment = segments
            .get_mut(&handle)
            .ok_or_else(|| shm_error(format!("unknown buffer handle {handle}")))?;
        segment.mapped = false;
        Ok(())
    }
}
