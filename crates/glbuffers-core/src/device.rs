//! External buffer collaborator boundary and the in-process device

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::{Error, Result};

/// Buffer kind tag, forwarded to the device on allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Array,
    Element,
    PixelPack,
    PixelUnpack,
}

/// Usage hint forwarded with uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsageHint {
    StreamDraw,
    StreamRead,
    StreamCopy,
    #[default]
    StaticDraw,
    StaticRead,
    StaticCopy,
    DynamicDraw,
    DynamicRead,
    DynamicCopy,
}

/// Access mode requested when mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessHint {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

/// A live mapping of a device buffer
#[derive(Debug, Clone, Copy)]
pub struct MappedRegion {
    pub ptr: *mut u8,
    pub len: usize,
}

impl MappedRegion {
    /// View the mapped bytes
    ///
    /// # Safety
    /// The buffer must stay mapped (and undeleted) for the borrow.
    pub(crate) unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.ptr, self.len)
    }

    /// Mutably view the mapped bytes
    ///
    /// # Safety
    /// Same as [`MappedRegion::as_slice`], and no other live borrow.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn as_mut_slice(&self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

/// Synchronous boundary to the external buffer collaborator
///
/// All calls are blocking round trips; failures carry a retryable-vs-fatal
/// flag in [`Error::Device`].
pub trait BufferApi {
    /// Allocate a buffer of the given kind; handles are never 0
    fn allocate(&self, kind: BufferKind) -> Result<u32>;

    /// Release a buffer
    fn delete(&self, handle: u32);

    /// Whether the handle names a live buffer
    fn is_valid(&self, handle: u32) -> bool;

    /// Replace the buffer's full contents
    fn upload(&self, handle: u32, bytes: &[u8], usage: UsageHint) -> Result<()>;

    /// Map the buffer into host memory
    fn map(&self, handle: u32, access: AccessHint) -> Result<MappedRegion>;

    /// Release a mapping
    fn unmap(&self, handle: u32) -> Result<()>;
}

fn fatal(message: String) -> Error {
    Error::Device {
        message,
        retryable: false,
    }
}

fn busy(message: String) -> Error {
    Error::Device {
        message,
        retryable: true,
    }
}

struct Slot {
    bytes: Vec<u8>,
    mapped: bool,
}

/// Process-local device keeping buffer contents on the heap
///
/// The mapped pointer targets the slot's own allocation, which never moves
/// while the slot is mapped (uploads against a mapped slot are refused).
#[derive(Default)]
pub struct HeapDevice {
    slots: RefCell<HashMap<u32, Slot>>,
    next_handle: Cell<u32>,
}

impl HeapDevice {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
        }
    }
}

impl BufferApi for HeapDevice {
    fn allocate(&self, _kind: BufferKind) -> Result<u32> {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.slots.borrow_mut().insert(
            handle,
            Slot {
                bytes: Vec::new(),
                mapped: false,
            },
        );
        Ok(handle)
    }

    fn delete(&self, handle: u32) {
        self.slots.borrow_mut().remove(&handle);
    }

    fn is_valid(&self, handle: u32) -> bool {
        self.slots.borrow().contains_key(&handle)
    }

    fn upload(&self, handle: u32, bytes: &[u8], _usage: UsageHint) -> Result<()> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .get_mut(&handle)
            .ok_or_else(|| fatal(format!("unknown buffer handle {handle}")))?;
        if slot.mapped {
            return Err(busy(format!("buffer {handle} is mapped")));
        }
        slot.bytes.clear();
        slot.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn map(&self, handle: u32, _access: AccessHint) -> Result<MappedRegion> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .get_mut(&handle)
            .ok_or_else(|| fatal(format!("unknown buffer handle {handle}")))?;
        if slot.mapped {
            return Err(busy(format!("buffer {handle} is already mapped")));
        }
        slot.mapped = true;
        Ok(MappedRegion {
            ptr: slot.bytes.as_mut_ptr(),
            len: slot.bytes.len(),
        })
    }

    fn unmap(&self, handle: u32) -> Result<()> {
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .get_mut(&handle)
            .ok_or_else(|| fatal(format!("unknown buffer handle {handle}")))?;
        slot.mapped = false;
        Ok(())
    }
}
