//! Response body accumulator
//!
//! Collects an unknown number of byte chunks of unknown size into one
//! contiguous owned buffer, then hands it out with a trailing terminator byte.
//!
//! # Fail Points (enabled with `failpoints` feature)
//!
//! - `accumulator::append` - `alloc_failure` simulates a failed reservation

use std::borrow::Cow;
use std::ops::Deref;

#[cfg(feature = "failpoints")]
use fail::fail_point;

use crate::error::{Error, Result};

/// Sentinel byte appended by [`ByteAccumulator::finalize`].
pub const TERMINATOR: u8 = 0;

/// How the accumulator grows its storage when a chunk does not fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Let the vector over-allocate (doubling), amortized O(1) per byte.
    #[default]
    Amortized,
    /// Grow by exactly what the incoming chunk needs.
    ///
    /// Many small chunks cost O(n²) in copies; use only when memory is tight.
    ExactFit,
}

/// Append-only buffer fed by a single producer.
///
/// The terminator slot is always reserved ahead of time, so finalizing never
/// needs to reallocate.
#[derive(Debug)]
pub struct ByteAccumulator {
    data: Vec<u8>,
    growth: GrowthPolicy,
    max_bytes: Option<usize>,
}

impl Default for ByteAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteAccumulator {
    /// Create an empty accumulator with amortized growth and no byte limit.
    pub fn new() -> Self {
        Self::with_growth(GrowthPolicy::default())
    }

    /// Create an empty accumulator with the given growth policy.
    pub fn with_growth(growth: GrowthPolicy) -> Self {
        Self {
            data: Vec::with_capacity(1),
            growth,
            max_bytes: None,
        }
    }

    /// Reject any append that would take the total past `max_bytes`.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Number of bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocated capacity in bytes, including the reserved terminator slot.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Bytes accumulated so far, in delivery order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append a chunk, growing storage as needed.
    ///
    /// On error nothing is copied and the accumulator keeps its prior contents.
    pub fn append(&mut self, chunk: &[u8]) -> Result<usize> {
        if chunk.is_empty() {
            return Ok(0);
        }

        // Any action simulates the allocator refusing to grow
        #[cfg(feature = "failpoints")]
        fail_point!("accumulator::append", |_| Err(Error::Allocation {
            requested: self.data.len().saturating_add(chunk.len()),
        }));

        let new_len = self
            .data
            .len()
            .checked_add(chunk.len())
            .ok_or(Error::Allocation {
                requested: usize::MAX,
            })?;

        if let Some(limit) = self.max_bytes {
            if new_len > limit {
                return Err(Error::ResponseTooLarge { limit });
            }
        }

        // +1 keeps the terminator slot available for finalize
        let additional = chunk.len() + 1;
        let reserved = match self.growth {
            GrowthPolicy::Amortized => self.data.try_reserve(additional),
            GrowthPolicy::ExactFit => self.data.try_reserve_exact(additional),
        };
        reserved.map_err(|_| Error::Allocation {
            requested: new_len + 1,
        })?;

        self.data.extend_from_slice(chunk);
        Ok(chunk.len())
    }

    /// Byte-sink adapter: returns the accepted count, `0` when the chunk was refused.
    ///
    /// A short count is how a transport learns that ingestion failed.
    pub fn accept(&mut self, chunk: &[u8]) -> usize {
        self.append(chunk).unwrap_or(0)
    }

    /// Hand out the accumulated bytes with the terminator appended.
    pub fn finalize(mut self) -> Body {
        self.data.push(TERMINATOR);
        Body { bytes: self.data }
    }
}

/// Finalized response body.
///
/// The underlying buffer always ends with [`TERMINATOR`]; every accessor except
/// [`Body::as_bytes_with_nul`] and [`Body::into_boxed_with_nul`] hides it.
#[derive(Clone, PartialEq, Eq)]
pub struct Body {
    bytes: Vec<u8>,
}

impl Body {
    /// Zero-length, terminated body.
    pub fn empty() -> Self {
        Self {
            bytes: vec![TERMINATOR],
        }
    }

    /// Body length, excluding the terminator.
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Body bytes without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Body bytes followed by the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the body as a UTF-8 string (lossy)
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Take the body bytes, dropping the terminator.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.bytes.pop();
        self.bytes
    }

    /// Take the raw terminated buffer, sized exactly to `len() + 1`.
    pub fn into_boxed_with_nul(self) -> Box<[u8]> {
        self.bytes.into_boxed_slice()
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Body {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for Body {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview = &self.as_bytes()[..self.len().min(64)];
        f.debug_struct("Body")
            .field("len", &self.len())
            .field("preview", &String::from_utf8_lossy(preview))
            .finish()
    }
}
