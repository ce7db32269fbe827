use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{PixelFormat, VideoInfo};
use crate::io::Mapping;
use crate::simulation::{HardwareSimulation, Registers, State};
use crate::synthesizer::FlatSynthesizer;
use crate::traits::{CaptureSink, HardwareSink, MappingOwner};

/// Stream a capture sink acquired the hardware for
struct Resources {
    sink: Arc<dyn CaptureSink>,
    info: VideoInfo,
    format: PixelFormat,
}

/// Device side of the interrupt, shared with the hardware timer
#[derive(Default)]
struct DeviceState {
    resources: Mutex<Option<Resources>>,
    last_completed: AtomicU32,
    interrupt_time: AtomicU64,
}

impl HardwareSink for DeviceState {
    fn on_interrupt(&self, registers: &Registers<'_>) {
        self.interrupt_time.fetch_add(1, Ordering::SeqCst);

        let completed = registers.mappings_completed();
        let last = self.last_completed.swap(completed, Ordering::SeqCst);

        let sink = match self.resources.lock().as_ref() {
            Some(resources) => Arc::clone(&resources.sink),
            None => return,
        };
        sink.complete_mappings(completed.wrapping_sub(last));
    }
}

/// Capture device driving the simulated hardware on behalf of one capture sink at a time
pub struct CaptureDevice {
    hw: HardwareSimulation,
    state: Arc<DeviceState>,
}

impl CaptureDevice {
    /// Returns a device with stopped hardware and no resources acquired
    ///
    /// # Example
    ///
    /// ```
    /// use capsim::CaptureDevice;
    /// let dev = CaptureDevice::new();
    /// ```
    pub fn new() -> Result<Self> {
        CaptureDevice::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let state = Arc::new(DeviceState::default());
        let hw = HardwareSimulation::with_config(config, state.clone())?;
        Ok(CaptureDevice { hw, state })
    }

    /// Claims the hardware for `sink`, which is told about every completed mapping
    ///
    /// # Arguments
    ///
    /// * `sink` - Receiver of mapping completions
    /// * `info` - Stream the hardware will produce
    pub fn acquire_hardware_resources(
        &self,
        sink: Arc<dyn CaptureSink>,
        info: VideoInfo,
    ) -> Result<()> {
        let format =
            PixelFormat::from_fourcc(info.fourcc).ok_or(Error::UnsupportedFormat(info.fourcc))?;

        let mut resources = self.state.resources.lock();
        if resources.is_some() {
            return Err(Error::SharingViolation);
        }
        *resources = Some(Resources { sink, info, format });

        debug!(fourcc = %info.fourcc, width = info.width, height = info.height, "resources acquired");
        Ok(())
    }

    /// Gives up the claim taken by `acquire_hardware_resources`
    pub fn release_hardware_resources(&self) {
        if self.state.resources.lock().take().is_some() {
            debug!("resources released");
        }
    }

    /// Stream the hardware is currently acquired for
    pub fn video_info(&self) -> Option<VideoInfo> {
        self.state.resources.lock().as_ref().map(|r| r.info)
    }

    /// Starts the hardware with the acquired stream description
    pub fn start(&self) -> Result<()> {
        let (info, format) = match self.state.resources.lock().as_ref() {
            Some(resources) => (resources.info, resources.format),
            None => return Err(Error::NotAcquired),
        };
        let interval = info
            .interval
            .to_duration()
            .ok_or_else(|| Error::invalid(format!("frame interval {}", info.interval)))?;

        if self.hw.state() == State::Stopped {
            self.state.last_completed.store(0, Ordering::SeqCst);
            self.state.interrupt_time.store(0, Ordering::SeqCst);
        }

        info!(format = %format, "starting capture");
        self.hw.start(
            Box::new(FlatSynthesizer::black(format)),
            interval,
            info.width,
            info.height.unsigned_abs(),
            info.image_size as usize,
        )
    }

    pub fn pause(&self, pausing: bool) -> Result<()> {
        self.hw.pause(pausing)
    }

    pub fn stop(&self) -> Result<()> {
        self.hw.stop()
    }

    /// Hands consecutive chunks of `*buffer` to the hardware
    ///
    /// See [`HardwareSimulation::program_scatter_gather_mappings`].
    ///
    /// # Safety
    ///
    /// Same contract as [`HardwareSimulation::program_scatter_gather_mappings`].
    pub unsafe fn program_scatter_gather_mappings(
        &self,
        owner: &Arc<dyn MappingOwner>,
        buffer: &mut *mut u8,
        mappings: &[Mapping],
    ) -> u32 {
        self.hw.program_scatter_gather_mappings(owner, buffer, mappings)
    }

    /// Number of interrupts since the last start
    pub fn query_interrupt_time(&self) -> u64 {
        self.state.interrupt_time.load(Ordering::SeqCst)
    }

    /// Feeds a top-down RGB24 frame to the hardware
    pub fn set_data(&self, frame: &[u8]) {
        self.hw.set_data(frame);
    }

    pub fn skipped_frame_count(&self) -> u32 {
        self.hw.skipped_frame_count()
    }

    /// The simulated hardware behind this device
    pub fn hardware(&self) -> &HardwareSimulation {
        &self.hw
    }
}
