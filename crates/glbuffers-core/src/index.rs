//! Index and slice normalization with Python-slice semantics

use crate::{Error, Result};

/// Slice arguments; any bound may be omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(
        start: impl Into<Option<i64>>,
        stop: impl Into<Option<i64>>,
        step: impl Into<Option<i64>>,
    ) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
            step: step.into(),
        }
    }

    /// The full, forward slice (`[:]`)
    pub fn full() -> Self {
        Self::default()
    }
}

impl From<std::ops::Range<i64>> for Slice {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::new(r.start, r.end, None)
    }
}

impl From<std::ops::RangeFrom<i64>> for Slice {
    fn from(r: std::ops::RangeFrom<i64>) -> Self {
        Self::new(r.start, None, None)
    }
}

impl From<std::ops::RangeTo<i64>> for Slice {
    fn from(r: std::ops::RangeTo<i64>) -> Self {
        Self::new(None, r.end, None)
    }
}

impl From<std::ops::RangeFull> for Slice {
    fn from(_: std::ops::RangeFull) -> Self {
        Self::full()
    }
}

/// Normalize a single index against `length`
///
/// Negative indices count from the end.
pub fn eval_index(index: i64, length: usize) -> Result<usize> {
    let len = length as i64;
    let norm = if index < 0 { index + len } else { index };
    if norm < 0 || norm >= len {
        return Err(Error::IndexOutOfBound { index, length });
    }
    Ok(norm as usize)
}

/// Normalize a slice against `length`, returning `(low, high, step)`
///
/// For a positive step the range is `[low, high)` walked upward from `low`;
/// for a negative step it is `(low, high]` walked downward from `high`.
/// Explicit bounds falling outside the buffer are an error rather than being
/// clamped.
pub fn eval_slice(slice: &Slice, length: usize) -> Result<(i64, i64, i64)> {
    let len = length as i64;

    let step = slice.step.unwrap_or(1);
    if step == 0 {
        return Err(Error::ZeroStep);
    }

    let norm = |v: i64| if v < 0 { v + len } else { v };
    let oob = || Error::SliceOutOfBound {
        start: slice.start.unwrap_or(if step > 0 { 0 } else { len - 1 }),
        stop: slice.stop.unwrap_or(if step > 0 { len } else { -1 }),
        length,
    };

    let start = match slice.start {
        Some(raw) => {
            let v = norm(raw);
            if v < 0 || v >= len {
                return Err(oob());
            }
            v
        }
        None => {
            if step > 0 {
                0
            } else {
                len - 1
            }
        }
    };

    let stop = match slice.stop {
        Some(raw) => {
            let v = norm(raw);
            let max = if step > 0 { len } else { len - 1 };
            if v < 0 || v > max {
                return Err(oob());
            }
            v
        }
        None => {
            if step > 0 {
                len
            } else {
                -1
            }
        }
    };

    if step > 0 {
        Ok((start, stop, step))
    } else {
        Ok((stop, start, step))
    }
}

/// Number of indices a normalized slice covers
pub fn slice_len((low, high, step): (i64, i64, i64)) -> usize {
    if high <= low {
        return 0;
    }
    let span = (high - low) as u64;
    let step = step.unsigned_abs();
    ((span + step - 1) / step) as usize
}

/// Iterate the indices of a normalized slice in traversal order
pub fn slice_indices(range: (i64, i64, i64)) -> impl Iterator<Item = usize> {
    let (low, high, step) = range;
    let count = slice_len(range);
    let first = if step > 0 { low } else { high };
    (0..count as i64).map(move |k| (first + step * k) as usize)
}
