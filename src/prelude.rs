pub use crate::device::CaptureDevice;
pub use crate::format::{PixelFormat, VideoInfo};
pub use crate::fraction::Fraction;
pub use crate::io::{FrameLayout, Mapping};
pub use crate::simulation::{HardwareSimulation, State};
pub use crate::traits::{CaptureSink, HardwareSink, ImageSynthesizer, MappingOwner};
