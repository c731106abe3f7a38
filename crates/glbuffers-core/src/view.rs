//! Random access views over a buffer's records

use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::buffer::BufferInner;
use crate::codec::ItemView;
use crate::index::{self, Slice};
use crate::layout::RecordLayout;
use crate::value::Value;
use crate::{Error, Result};

/// Subscript key: a single index or a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Index(i64),
    Slice(Slice),
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Index(i)
    }
}

impl From<Slice> for Key {
    fn from(s: Slice) -> Self {
        Key::Slice(s)
    }
}

/// Items fetched by a keyed read
pub enum Fetched {
    One(ItemView),
    Many(ItemViews),
}

/// Non-owning cursor over a buffer's records
///
/// Holds a weak back-reference only; every call re-resolves the owning
/// buffer, so a view taken before the buffer was dropped fails with
/// [`Error::Freed`] instead of touching a dead handle.
#[derive(Clone)]
pub struct BufferView {
    buffer: Weak<BufferInner>,
}

impl BufferView {
    pub(crate) fn new(buffer: Weak<BufferInner>) -> Self {
        Self { buffer }
    }

    fn resolve(&self) -> Result<Rc<BufferInner>> {
        match self.buffer.upgrade() {
            Some(inner) if !inner.freed.get() => Ok(inner),
            _ => Err(Error::Freed),
        }
    }

    /// Read one record
    pub fn get(&self, index: i64) -> Result<ItemView> {
        let inner = self.resolve()?;
        let i = index::eval_index(index, inner.length.get())?;
        let stride = inner.layout.stride();
        let bytes = inner.read_bytes(i * stride, stride)?;
        Ok(inner.layout.read_item(&bytes))
    }

    /// Read a range of records
    ///
    /// The covering byte span is fetched once; items decode lazily.
    pub fn get_slice(&self, slice: &Slice) -> Result<ItemViews> {
        let inner = self.resolve()?;
        let range = index::eval_slice(slice, inner.length.get())?;
        let indices: Vec<usize> = index::slice_indices(range).collect();
        let stride = inner.layout.stride();

        let (base, bytes) = match (indices.iter().min(), indices.iter().max()) {
            (Some(&lo), Some(&hi)) => {
                (lo, inner.read_bytes(lo * stride, (hi - lo + 1) * stride)?)
            }
            _ => (0, Vec::new()),
        };

        Ok(ItemViews {
            layout: Arc::clone(&inner.layout),
            bytes,
            base,
            indices,
        })
    }

    /// Write one record in place
    pub fn set(&self, index: i64, value: &Value) -> Result<()> {
        let inner = self.resolve()?;
        let i = index::eval_index(index, inner.length.get())?;
        let record = inner.layout.pack_single(value)?;
        inner.write_bytes(i * inner.layout.stride(), record.as_bytes())
    }

    /// Replace the records a slice covers; never resizes
    ///
    /// Strided writes (|step| > 1) require a live mapping.
    pub fn set_slice(&self, slice: &Slice, values: &[Value]) -> Result<()> {
        let inner = self.resolve()?;
        let range = index::eval_slice(slice, inner.length.get())?;
        let (low, _, step) = range;

        if step.abs() != 1 && !inner.is_mapped() {
            return Err(Error::UnmappedStridedWrite);
        }
        if index::slice_len(range) != values.len() {
            return Err(Error::Resize);
        }
        if values.is_empty() {
            return Ok(());
        }

        let stride = inner.layout.stride();
        let records = inner.layout.pack(values)?;

        match step {
            1 => inner.write_bytes(low as usize * stride, records.as_bytes()),
            -1 => {
                // contiguous span written in one pass, record order reversed
                let mut bytes = vec![0u8; records.as_bytes().len()];
                for (src, dst) in records
                    .as_bytes()
                    .chunks(stride)
                    .zip(bytes.chunks_mut(stride).rev())
                {
                    dst.copy_from_slice(src);
                }
                inner.write_bytes((low + 1) as usize * stride, &bytes)
            }
            _ => {
                for (chunk, i) in records
                    .as_bytes()
                    .chunks(stride)
                    .zip(index::slice_indices(range))
                {
                    inner.write_bytes(i * stride, chunk)?;
                }
                Ok(())
            }
        }
    }

    /// Replace the buffer's full contents, resizing to fit
    pub fn set_data(&self, rows: &[Value]) -> Result<()> {
        let inner = self.resolve()?;
        let records = inner.layout.pack(rows)?;
        inner.replace_all(records.as_bytes(), rows.len())
    }

    /// Dispatch a keyed read
    pub fn get_key(&self, key: &Key) -> Result<Fetched> {
        match key {
            Key::Index(i) => Ok(Fetched::One(self.get(*i)?)),
            Key::Slice(s) => Ok(Fetched::Many(self.get_slice(s)?)),
        }
    }

    /// Dispatch a keyed write
    pub fn set_key(&self, key: &Key, value: &Value) -> Result<()> {
        match key {
            Key::Index(i) => self.set(*i, value),
            Key::Slice(s) => match value {
                Value::Seq(rows) => self.set_slice(s, rows),
                Value::Num(_) => Err(Error::Resize),
            },
        }
    }
}

/// Lazy sequence of [`ItemView`]s covering a normalized slice
pub struct ItemViews {
    layout: Arc<RecordLayout>,
    bytes: Vec<u8>,
    base: usize,
    indices: Vec<usize>,
}

impl ItemViews {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Decode the `n`-th item of the traversal
    pub fn get(&self, n: usize) -> Option<ItemView> {
        let index = *self.indices.get(n)?;
        let stride = self.layout.stride();
        let at = (index - self.base) * stride;
        Some(self.layout.read_item(&self.bytes[at..at + stride]))
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { views: self, pos: 0 }
    }
}

impl<'a> IntoIterator for &'a ItemViews {
    type Item = ItemView;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a> {
    views: &'a ItemViews,
    pos: usize,
}

impl Iterator for Iter<'_> {
    type Item = ItemView;

    fn next(&mut self) -> Option<ItemView> {
        let item = self.views.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.views.len() - self.pos;
        (left, Some(left))
    }
}
