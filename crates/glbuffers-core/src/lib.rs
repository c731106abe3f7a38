//! glbuffers - format-described binary record buffers
//!
//! A compact format string such as `"(3f)[vertex](4B)[color]"` describes the
//! layout of one fixed-size binary record. Compiled layouts pack and unpack
//! sequences of records, and [`Buffer`]/[`BufferView`] give random access and
//! slice assignment over records stored in a device buffer, either mapped
//! (zero copy, inside a [`Buffer::map`] scope) or unmapped (read/upload round
//! trips through the device).

pub mod buffer;
pub mod codec;
pub mod device;
pub mod dtype;
pub mod error;
pub mod index;
pub mod layout;
pub mod shm;
pub mod token;
pub mod value;
pub mod view;

pub use buffer::{Buffer, MapGuard};
pub use codec::{ItemView, Record, Records};
pub use device::{AccessHint, BufferApi, BufferKind, HeapDevice, MappedRegion, UsageHint};
pub use dtype::DType;
pub use error::{Error, Result};
pub use index::{eval_index, eval_slice, slice_indices, slice_len, Slice};
pub use layout::RecordLayout;
pub use shm::ShmDevice;
pub use token::{parse, FormatToken};
pub use value::Value;
pub use view::{BufferView, Fetched, ItemViews, Key};
