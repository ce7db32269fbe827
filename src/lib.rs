//! Simulated capture hardware
//!
//! A timer driven stand-in for a frame grabber: the owner programs scatter-gather mappings into
//! caller-owned memory, and once per frame interval the simulated interrupt places a whole frame
//! into them, or counts the frame as skipped when too few are queued.
//!
//! [`HardwareSimulation`] is the hardware itself. [`CaptureDevice`] sits on top of it, owns the
//! exclusive claim on the hardware and forwards completed mappings to a [`CaptureSink`].

mod clock;
pub use clock::FrameClock;

mod config;
pub use config::{Config, FrameSource, SCATTER_GATHER_MAPPINGS_MAX};

mod device;
pub use device::CaptureDevice;

mod error;
pub use error::{Error, Result};

pub mod format;
pub use format::{Geometry, PixelFormat, VideoInfo};

mod fraction;
pub use fraction::Fraction;

pub mod io;
pub use io::{FrameLayout, Mapping};

mod memory;

pub mod prelude;

mod simulation;
pub use simulation::{HardwareSimulation, Registers, State};

mod synthesizer;
pub use synthesizer::FlatSynthesizer;

mod sync;
mod timer;

mod traits;
pub use traits::{CaptureSink, HardwareSink, ImageSynthesizer, MappingOwner};
