use std::collections::VecDeque;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::io::descriptor::{Descriptor, Mapping};
use crate::io::pool::Pool;
use crate::memory::Region;
use crate::traits::MappingOwner;

/// The queued descriptors cannot hold a whole frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Starved {
    pub rows_missing: usize,
}

struct Inner {
    pool: Pool<Descriptor>,
    fifo: VecDeque<usize>,
    bytes_queued: usize,
    open: bool,
}

/// FIFO of scatter-gather descriptors waiting for frame data
///
/// Every access happens under one short, non-allocating critical section so it can be shared
/// between the tick and the request path.
pub struct ScatterGatherQueue {
    inner: Mutex<Inner>,
}

impl ScatterGatherQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        ScatterGatherQueue {
            inner: Mutex::new(Inner {
                pool: Pool::with_capacity(capacity),
                fifo: VecDeque::with_capacity(capacity),
                bytes_queued: 0,
                open: false,
            }),
        }
    }

    /// Starts accepting descriptors
    pub(crate) fn open(&self) {
        self.inner.lock().open = true;
    }

    /// Stops accepting descriptors and discards everything still queued
    ///
    /// Returns the number of descriptors discarded without being written.
    pub(crate) fn close(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.open = false;

        let mut discarded = 0;
        while let Some(index) = inner.fifo.pop_front() {
            inner.pool.release(index);
            discarded += 1;
        }
        inner.bytes_queued = 0;
        debug_assert_eq!(inner.pool.in_use(), 0);
        discarded
    }

    /// Appends one descriptor per mapping, carving consecutive chunks out of `*buffer`
    ///
    /// `*buffer` is advanced past every chunk that was queued. Stops early when the pool is
    /// exhausted or the queue is closed and returns the number of descriptors inserted.
    ///
    /// # Safety
    ///
    /// Every chunk must be valid for writes until it is drained or the queue is closed.
    pub(crate) unsafe fn program(
        &self,
        owner: &Arc<dyn MappingOwner>,
        buffer: &mut *mut u8,
        mappings: &[Mapping],
    ) -> u32 {
        let mut inner = self.inner.lock();
        if !inner.open {
            return 0;
        }

        let mut inserted = 0;
        for mapping in mappings {
            let ptr = match NonNull::new(*buffer) {
                Some(ptr) => ptr,
                None => break,
            };
            let len = mapping.byte_count as usize;
            let descriptor = Descriptor {
                region: Region::new(ptr, len),
                owner: Arc::clone(owner),
            };

            let index = match inner.pool.allocate(descriptor) {
                Ok(index) => index,
                Err(_) => break,
            };
            inner.fifo.push_back(index);
            inner.bytes_queued += len;

            *buffer = buffer.wrapping_add(len);
            inserted += 1;
        }

        inserted
    }

    /// Places one frame of `row_bytes` wide rows into descriptors taken from the head
    ///
    /// Either the whole frame is placed and the number of descriptors completed is returned, or
    /// nothing is consumed.
    pub(crate) fn drain(&self, frame: &[u8], row_bytes: usize) -> Result<u32, Starved> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        let mut rows_missing = frame.len() / row_bytes.max(1);
        let mut needed = 0;
        for &index in inner.fifo.iter() {
            if rows_missing == 0 {
                break;
            }
            if let Some(descriptor) = inner.pool.get(index) {
                rows_missing -= descriptor.rows(row_bytes).min(rows_missing);
            }
            needed += 1;
        }
        if rows_missing > 0 {
            return Err(Starved { rows_missing });
        }

        let mut completed = 0;
        let mut placed = 0;
        for _ in 0..needed {
            let descriptor = inner
                .fifo
                .pop_front()
                .and_then(|index| inner.pool.release(index));
            if let Some(mut descriptor) = descriptor {
                placed += descriptor.fill(&frame[placed..], row_bytes) * row_bytes;
                inner.bytes_queued -= descriptor.byte_count();
                completed += 1;
            }
        }

        Ok(completed)
    }

    /// Number of descriptors waiting for data
    pub fn len(&self) -> usize {
        self.inner.lock().fifo.len()
    }

    /// Total capacity in bytes of the queued descriptors
    pub fn bytes_queued(&self) -> usize {
        self.inner.lock().bytes_queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::descriptor::FrameLayout;
    use proptest::prelude::*;

    fn packed() -> Arc<dyn MappingOwner> {
        Arc::new(FrameLayout::default())
    }

    fn queue_with(capacity: usize) -> ScatterGatherQueue {
        let queue = ScatterGatherQueue::with_capacity(capacity);
        queue.open();
        queue
    }

    fn program(
        queue: &ScatterGatherQueue,
        owner: &Arc<dyn MappingOwner>,
        buf: &mut [u8],
        lens: &[u32],
    ) -> u32 {
        let mappings: Vec<Mapping> = lens.iter().copied().map(Mapping::new).collect();
        let mut ptr = buf.as_mut_ptr();
        unsafe { queue.program(owner, &mut ptr, &mappings) }
    }

    #[test]
    fn closed_queue_rejects_mappings() {
        let queue = ScatterGatherQueue::with_capacity(4);
        let mut buf = vec![0u8; 8];
        assert_eq!(program(&queue, &packed(), &mut buf, &[8]), 0);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn program_advances_buffer_and_accounts_bytes() {
        let queue = queue_with(4);
        let mut buf = vec![0u8; 16];
        let base = buf.as_mut_ptr();
        let mut ptr = base;
        let mappings = [Mapping::new(6), Mapping::new(10)];

        let inserted = unsafe { queue.program(&packed(), &mut ptr, &mappings) };
        assert_eq!(inserted, 2);
        assert_eq!(ptr, base.wrapping_add(16));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.bytes_queued(), 16);
    }

    #[test]
    fn pool_exhaustion_reports_partial_insert() {
        let queue = queue_with(2);
        let mut buf = vec![0u8; 12];
        assert_eq!(program(&queue, &packed(), &mut buf, &[4, 4, 4]), 2);
        assert_eq!(queue.bytes_queued(), 8);
    }

    #[test]
    fn frame_spans_descriptors_in_order() {
        let queue = queue_with(4);
        let mut buf = vec![0u8; 8];
        program(&queue, &packed(), &mut buf, &[4, 4]);

        let frame = [1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(queue.drain(&frame, 2), Ok(2));
        assert_eq!(buf, frame);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.bytes_queued(), 0);
    }

    #[test]
    fn short_queue_consumes_nothing() {
        let queue = queue_with(4);
        let mut buf = vec![0u8; 12];
        program(&queue, &packed(), &mut buf, &[12]);

        assert_eq!(queue.drain(&[7u8; 24], 12), Err(Starved { rows_missing: 1 }));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.bytes_queued(), 12);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn negative_pitch_keeps_row_order() {
        let queue = queue_with(2);
        let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::with_pitch(-3));
        let mut buf = vec![0u8; 8];
        program(&queue, &owner, &mut buf, &[8]);

        // rows of two bytes, three bytes apart, top row first
        assert_eq!(queue.drain(&[1, 1, 2, 2], 2), Ok(1));
        assert_eq!(buf, [1, 1, 0, 2, 2, 0, 0, 0]);

        let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::with_pitch(-2));
        let mut buf = vec![0u8; 4];
        program(&queue, &owner, &mut buf, &[4]);
        assert_eq!(queue.drain(&[1, 1, 2, 2], 2), Ok(1));
        assert_eq!(buf, [1, 1, 2, 2]);
    }

    #[test]
    fn close_discards_queued_descriptors() {
        let queue = queue_with(4);
        let mut buf = vec![0u8; 12];
        program(&queue, &packed(), &mut buf, &[4, 4, 4]);

        assert_eq!(queue.close(), 3);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.bytes_queued(), 0);
        assert_eq!(program(&queue, &packed(), &mut buf, &[4]), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]

        #[test]
        fn drain_is_all_or_nothing_and_stays_in_bounds(
            lens in prop::collection::vec(0u32..40, 0..8),
            row_bytes in 1usize..8,
            rows in 1usize..6,
            pitch in -12i32..12,
        ) {
            const GUARD: u8 = 0xAA;
            let queue = queue_with(8);
            let owner: Arc<dyn MappingOwner> = Arc::new(FrameLayout::with_pitch(pitch));
            let total: usize = lens.iter().map(|&l| l as usize).sum();
            let mut buf = vec![GUARD; total + 16];
            program(&queue, &owner, &mut buf, &lens);

            let frame: Vec<u8> = (0..row_bytes * rows).map(|i| (i % 251) as u8).collect();
            let queued_before = queue.len();
            match queue.drain(&frame, row_bytes) {
                Ok(completed) => {
                    // consumed a prefix of the queue
                    prop_assert_eq!(queue.len(), queued_before - completed as usize);
                    let consumed: usize = lens[..completed as usize].iter().map(|&l| l as usize).sum();
                    prop_assert_eq!(queue.bytes_queued(), total - consumed);
                    // nothing past the consumed descriptors was touched
                    prop_assert!(buf[consumed..].iter().all(|&b| b == GUARD));
                    // every frame byte landed exactly once
                    let written = buf[..consumed].iter().filter(|&&b| b != GUARD).count();
                    prop_assert_eq!(written, frame.len());
                }
                Err(_) => {
                    prop_assert_eq!(queue.len(), queued_before);
                    prop_assert_eq!(queue.bytes_queued(), total);
                    prop_assert!(buf.iter().all(|&b| b == GUARD));
                }
            }
        }
    }
}
