use crate::simulation::Registers;

/// Receiver of the simulated interrupt
pub trait HardwareSink: Send + Sync {
    /// Called once for every tick of the hardware clock, including the tick that acknowledges a
    /// pause or stop
    ///
    /// Runs on the hardware timer thread and must not block.
    fn on_interrupt(&self, registers: &Registers<'_>);
}

/// Consumer of completed scatter-gather mappings
pub trait CaptureSink: Send + Sync {
    /// `count` more mappings, in programming order, have been filled with frame data
    fn complete_mappings(&self, count: u32);
}

/// Frame producer attached to the simulated hardware
pub trait ImageSynthesizer: Send {
    /// Frame dimensions in pixels
    fn set_image_size(&mut self, width: u32, height: u32);

    /// Attaches a synthesis buffer of `Some(len)` bytes, or detaches it with `None`
    fn set_buffer(&mut self, len: Option<usize>);

    fn bytes_per_pixel(&self) -> u32;

    /// Draws one frame into the attached synthesis buffer
    fn synthesize(&mut self, buffer: &mut [u8]);
}

/// Request a group of scatter-gather mappings belongs to
///
/// The hardware only reads layout hints from it.
pub trait MappingOwner: Send + Sync {
    /// Distance in bytes between rows in the destination, 0 for tightly packed rows
    fn surface_pitch(&self) -> i32 {
        0
    }
}
