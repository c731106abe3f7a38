//! Buffers over device handles and scoped mapping

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use crate::device::{AccessHint, BufferApi, BufferKind, MappedRegion, UsageHint};
use crate::layout::RecordLayout;
use crate::value::Value;
use crate::view::BufferView;
use crate::{Error, Result};

pub(crate) struct BufferInner {
    pub(crate) device: Rc<dyn BufferApi>,
    pub(crate) handle: u32,
    pub(crate) layout: Arc<RecordLayout>,
    pub(crate) length: Cell<usize>,
    requested_usage: UsageHint,
    applied_usage: Cell<UsageHint>,
    access: AccessHint,
    owned: bool,
    pub(crate) freed: Cell<bool>,
    mapping: RefCell<Option<MappedRegion>>,
}

impl BufferInner {
    pub(crate) fn is_mapped(&self) -> bool {
        self.mapping.borrow().is_some()
    }

    /// Read `len` bytes at `offset`; unmapped buffers are mapped for the
    /// duration of the call.
    pub(crate) fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        if let Some(region) = *self.mapping.borrow() {
            let bytes = unsafe { region.as_slice() };
            return Ok(bytes[offset..offset + len].to_vec());
        }
        let region = self.device.map(self.handle, AccessHint::ReadOnly)?;
        let out = unsafe { region.as_slice() }[offset..offset + len].to_vec();
        self.device.unmap(self.handle)?;
        Ok(out)
    }

    /// Write bytes at `offset` in place, through the live mapping or a
    /// scoped round trip.
    pub(crate) fn write_bytes(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        if let Some(region) = *self.mapping.borrow() {
            let dst = unsafe { region.as_mut_slice() };
            dst[offset..offset + bytes.len()].copy_from_slice(bytes);
            return Ok(());
        }
        let region = self.device.map(self.handle, AccessHint::ReadWrite)?;
        let dst = unsafe { region.as_mut_slice() };
        dst[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.device.unmap(self.handle)
    }

    /// Upload-replace the full contents; only legal while unmapped.
    pub(crate) fn replace_all(&self, bytes: &[u8], length: usize) -> Result<()> {
        if self.is_mapped() {
            return Err(Error::MappedResize);
        }
        self.device
            .upload(self.handle, bytes, self.requested_usage)?;
        self.applied_usage.set(self.requested_usage);
        self.length.set(length);
        Ok(())
    }
}

/// A device buffer holding packed records described by a [`RecordLayout`]
///
/// The buffer owns its device handle (unless wrapped with
/// [`Buffer::from_raw`]) and releases it on drop; views taken from it detect
/// the freed state on every access.
pub struct Buffer {
    inner: Rc<BufferInner>,
}

impl Buffer {
    /// Create an array (vertex data) buffer
    pub fn array(device: Rc<dyn BufferApi>, format: &str) -> Result<Self> {
        Self::with_options(
            device,
            BufferKind::Array,
            format,
            UsageHint::default(),
            AccessHint::default(),
        )
    }

    /// Create an element (index data) buffer
    pub fn element(device: Rc<dyn BufferApi>, format: &str) -> Result<Self> {
        Self::with_options(
            device,
            BufferKind::Element,
            format,
            UsageHint::default(),
            AccessHint::default(),
        )
    }

    /// Create a pixel pack buffer
    pub fn pixel_pack(device: Rc<dyn BufferApi>, format: &str) -> Result<Self> {
        Self::with_options(
            device,
            BufferKind::PixelPack,
            format,
            UsageHint::default(),
            AccessHint::default(),
        )
    }

    /// Create a pixel unpack buffer
    pub fn pixel_unpack(device: Rc<dyn BufferApi>, format: &str) -> Result<Self> {
        Self::with_options(
            device,
            BufferKind::PixelUnpack,
            format,
            UsageHint::default(),
            AccessHint::default(),
        )
    }

    /// Create a buffer with explicit kind and hints
    pub fn with_options(
        device: Rc<dyn BufferApi>,
        kind: BufferKind,
        format: &str,
        usage: UsageHint,
        access: AccessHint,
    ) -> Result<Self> {
        let layout = RecordLayout::from_string(format)?;
        let handle = device.allocate(kind)?;
        Ok(Self {
            inner: Rc::new(BufferInner {
                device,
                handle,
                layout,
                length: Cell::new(0),
                requested_usage: usage,
                applied_usage: Cell::new(UsageHint::StaticDraw),
                access,
                owned: true,
                freed: Cell::new(false),
                mapping: RefCell::new(None),
            }),
        })
    }

    /// Wrap an externally allocated handle
    ///
    /// The handle is only released on drop when `owned` is true.
    pub fn from_raw(
        device: Rc<dyn BufferApi>,
        handle: u32,
        format: &str,
        owned: bool,
    ) -> Result<Self> {
        let layout = RecordLayout::from_string(format)?;
        Ok(Self {
            inner: Rc::new(BufferInner {
                device,
                handle,
                layout,
                length: Cell::new(0),
                requested_usage: UsageHint::default(),
                applied_usage: Cell::new(UsageHint::StaticDraw),
                access: AccessHint::default(),
                owned,
                freed: Cell::new(false),
                mapping: RefCell::new(None),
            }),
        })
    }

    /// Record count
    pub fn len(&self) -> usize {
        self.inner.length.get()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size in bytes
    pub fn size(&self) -> usize {
        self.len() * self.inner.layout.stride()
    }

    /// Device handle
    pub fn handle(&self) -> u32 {
        self.inner.handle
    }

    pub fn layout(&self) -> &Arc<RecordLayout> {
        &self.inner.layout
    }

    pub fn format(&self) -> &str {
        self.inner.layout.format()
    }

    /// Usage hint applied at the most recent upload
    pub fn usage(&self) -> UsageHint {
        self.inner.applied_usage.get()
    }

    pub fn access(&self) -> AccessHint {
        self.inner.access
    }

    /// Whether the device still recognizes the handle
    pub fn valid(&self) -> bool {
        !self.inner.freed.get() && self.inner.device.is_valid(self.inner.handle)
    }

    pub fn mapped(&self) -> bool {
        self.inner.is_mapped()
    }

    /// Resize to exactly `count` records, truncating or zero-padding
    ///
    /// Only legal while unmapped.
    pub fn reserve(&self, count: usize) -> Result<()> {
        if self.inner.is_mapped() {
            return Err(Error::MappedResize);
        }
        let stride = self.inner.layout.stride();
        let keep = self.len().min(count);
        let mut bytes = if keep > 0 {
            self.inner.read_bytes(0, keep * stride)?
        } else {
            Vec::new()
        };
        bytes.resize(count * stride, 0);
        self.inner.replace_all(&bytes, count)
    }

    /// Replace the full contents, resizing to `rows.len()` records
    pub fn set_data(&self, rows: &[Value]) -> Result<()> {
        let records = self.inner.layout.pack(rows)?;
        self.inner.replace_all(records.as_bytes(), rows.len())
    }

    /// Map the buffer for scoped zero-copy access
    ///
    /// The returned guard unmaps on drop, on every exit path. Re-entrant
    /// mapping is an error.
    pub fn map(&self) -> Result<MapGuard> {
        if self.inner.is_mapped() {
            return Err(Error::AlreadyMapped);
        }
        let region = self.inner.device.map(self.inner.handle, self.inner.access)?;
        *self.inner.mapping.borrow_mut() = Some(region);
        Ok(MapGuard {
            inner: Rc::clone(&self.inner),
        })
    }

    /// Random-access view over the records
    pub fn data(&self) -> BufferView {
        BufferView::new(Rc::downgrade(&self.inner))
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.inner.freed.set(true);
        if self.inner.mapping.borrow_mut().take().is_some() {
            let _ = self.inner.device.unmap(self.inner.handle);
        }
        if self.inner.owned {
            self.inner.device.delete(self.inner.handle);
        }
    }
}

/// RAII mapping scope
pub struct MapGuard {
    inner: Rc<BufferInner>,
}

impl Drop for MapGuard {
    fn drop(&mut self) {
        if self.inner.freed.get() {
            return;
        }
        if self.inner.mapping.borrow_mut().take().is_some() {
            let _ = self.inner.device.unmap(self.inner.handle);
        }
    }
}
