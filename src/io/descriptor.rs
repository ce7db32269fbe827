use std::sync::Arc;

use crate::memory::Region;
use crate::traits::MappingOwner;

/// One entry of a scatter-gather list handed to the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Bytes covered by this entry
    pub byte_count: u32,
}

impl Mapping {
    pub fn new(byte_count: u32) -> Self {
        Mapping { byte_count }
    }
}

/// Layout hints attached to a capture request
///
/// A `surface_pitch` of zero means tightly packed rows. Only the magnitude of a negative pitch
/// is used; rows are always written top to bottom.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub surface_pitch: i32,
}

impl FrameLayout {
    pub fn with_pitch(surface_pitch: i32) -> Self {
        FrameLayout { surface_pitch }
    }
}

impl MappingOwner for FrameLayout {
    fn surface_pitch(&self) -> i32 {
        self.surface_pitch
    }
}

/// Queued destination awaiting frame data
pub(crate) struct Descriptor {
    pub region: Region,
    pub owner: Arc<dyn MappingOwner>,
}

impl Descriptor {
    pub fn byte_count(&self) -> usize {
        self.region.len()
    }

    /// Row pitch in the destination
    pub fn pitch(&self, row_bytes: usize) -> usize {
        match self.owner.surface_pitch() {
            0 => row_bytes,
            hint => (hint.unsigned_abs() as usize).max(row_bytes),
        }
    }

    pub fn rows(&self, row_bytes: usize) -> usize {
        self.region.rows(row_bytes, self.pitch(row_bytes))
    }

    /// Writes as many rows of `frame` as fit, returns the number written
    pub fn fill(&mut self, frame: &[u8], row_bytes: usize) -> usize {
        let pitch = self.pitch(row_bytes);
        self.region.write_rows(frame, row_bytes, pitch)
    }
}
