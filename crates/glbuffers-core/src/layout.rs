//! Record layout compilation and the process-wide format cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::token::{self, FormatToken};
use crate::{Error, Result};

static NEXT_LAYOUT_ID: AtomicU64 = AtomicU64::new(1);

fn cache() -> &'static Mutex<HashMap<String, Arc<RecordLayout>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Arc<RecordLayout>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Compiled, immutable description of one packed record
///
/// Fields are tightly packed in token order with no alignment padding,
/// matching the packed-struct contract expected by the device upload path.
#[derive(Debug)]
pub struct RecordLayout {
    id: u64,
    format: String,
    tokens: Vec<FormatToken>,
    offsets: Vec<usize>,
    stride: usize,
}

impl RecordLayout {
    /// Compile tokens into a layout
    pub fn compile(tokens: Vec<FormatToken>) -> Result<Self> {
        for (i, token) in tokens.iter().enumerate() {
            if tokens[..i].iter().any(|other| other.name == token.name) {
                return Err(Error::DuplicateField(token.name.clone()));
            }
        }

        let mut offsets = Vec::with_capacity(tokens.len());
        let mut stride = 0;
        for token in &tokens {
            offsets.push(stride);
            stride += token.count * token.kind.size();
        }

        let format = tokens
            .iter()
            .map(|t| format!("({}{})[{}]", t.count, t.kind.code(), t.name))
            .collect();

        Ok(Self {
            id: NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed),
            format,
            tokens,
            offsets,
            stride,
        })
    }

    /// Compile a format string, memoized process-wide by its
    /// whitespace-normalized form
    ///
    /// Equivalent strings return the same instance; callers may rely on
    /// `Arc::ptr_eq` for their own memoization.
    pub fn from_string(format: &str) -> Result<Arc<RecordLayout>> {
        let key: String = format.chars().filter(|c| !c.is_whitespace()).collect();

        let mut cache = cache().lock().unwrap_or_else(|e| e.into_inner());
        if let Some(layout) = cache.get(&key) {
            return Ok(Arc::clone(layout));
        }

        let layout = Arc::new(Self::compile(token::parse(format)?)?);
        cache.insert(key, Arc::clone(&layout));
        Ok(layout)
    }

    /// Identity token carried by packed records
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Normalized format string
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Total bytes per record
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Byte offset of a field within a record
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.tokens
            .iter()
            .position(|t| t.name == name)
            .map(|i| self.offsets[i])
    }

    pub(crate) fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use std::sync::Arc;

    #[test]
    fn test_compile_offsets() {
        let layout = RecordLayout::from_string("(3f)[vertex](4B)[color](3f)[normals]").unwrap();
        assert_eq!(3, layout.len());
        assert_eq!(12 + 4 + 12, layout.stride());
        assert_eq!(Some(0), layout.offset_of("vertex"));
        assert_eq!(Some(12), layout.offset_of("color"));
        assert_eq!(Some(16), layout.offset_of("normals"));
        assert_eq!(None, layout.offset_of("missing"));
        assert_eq!(DType::UInt8, layout.tokens()[1].kind);
    }

    #[test]
    fn test_cache_identity() {
        let a = RecordLayout::from_string("(3f)[cached]").unwrap();
        let b = RecordLayout::from_string("(3f)[cached]").unwrap();
        let c = RecordLayout::from_string(" ( 3 f ) [ cached ] ").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));

        let other = RecordLayout::from_string("(3i)[cached]").unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_duplicate_field() {
        let err = RecordLayout::from_string("(3f)[twice](2B)[twice]").unwrap_err();
        assert_eq!("Duplicate field name \"twice\"", err.to_string());
    }

    #[test]
    fn test_normalized_format() {
        let layout = RecordLayout::from_string(" (3 f)[sp  aced](   2 B)[packed] ").unwrap();
        assert_eq!("(3f)[spaced](2B)[packed]", layout.format());
    }
}
