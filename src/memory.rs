use std::{fmt, ptr::NonNull};

/// Caller-owned memory region a scatter-gather descriptor writes into
///
/// The region is already mapped into our address space. The simulation never owns it; the
/// owner guarantees it stays valid and unaliased until the descriptor is drained or discarded.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: a region is only dereferenced by the tick that drains it, under the queue lock, and
// the owner promised exclusive access for that long.
unsafe impl Send for Region {}

impl Region {
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `len` bytes until the region is dropped by the queue.
    pub(crate) unsafe fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Region { ptr, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of `row_bytes` wide rows that fit when rows are `pitch` bytes apart
    pub fn rows(&self, row_bytes: usize, pitch: usize) -> usize {
        if row_bytes == 0 || self.len < row_bytes {
            return 0;
        }
        (self.len - row_bytes) / pitch.max(row_bytes) + 1
    }

    /// Copies consecutive rows of `src` into the region
    ///
    /// Row `i` lands at `i * pitch`. Returns the number of rows written; rows that would not fit
    /// are left out.
    pub fn write_rows(&mut self, src: &[u8], row_bytes: usize, pitch: usize) -> usize {
        if row_bytes == 0 {
            return 0;
        }

        let pitch = pitch.max(row_bytes);
        let rows = (src.len() / row_bytes).min(self.rows(row_bytes, pitch));
        for (i, row) in src.chunks_exact(row_bytes).take(rows).enumerate() {
            let offset = i * pitch;
            debug_assert!(offset + row_bytes <= self.len);
            // SAFETY: offset + row_bytes <= len by construction of `rows`, and the region is
            // valid for writes per the constructor contract.
            unsafe {
                self.ptr
                    .as_ptr()
                    .add(offset)
                    .copy_from_nonoverlapping(row.as_ptr(), row_bytes);
            }
        }

        rows
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Allocates a zeroed frame buffer without aborting on allocation failure
pub(crate) fn try_zeroed(len: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, 0);
    Some(buf)
}
