use crate::format::PixelFormat;
use crate::traits::ImageSynthesizer;

/// Synthesizer painting every pixel the same value
pub struct FlatSynthesizer {
    format: PixelFormat,
    width: u32,
    height: u32,
    buffer_len: Option<usize>,
    /// Smallest repeating unit of the fill (a macropixel for YUY2)
    pattern: Vec<u8>,
}

impl FlatSynthesizer {
    /// Returns a synthesizer filling frames with black
    ///
    /// # Example
    ///
    /// ```
    /// use capsim::{FlatSynthesizer, ImageSynthesizer, PixelFormat};
    ///
    /// let synth = FlatSynthesizer::black(PixelFormat::Yuy2);
    /// assert_eq!(synth.bytes_per_pixel(), 2);
    /// ```
    pub fn black(format: PixelFormat) -> Self {
        let pattern = match format {
            PixelFormat::Rgb24 => vec![0, 0, 0],
            PixelFormat::Yuy2 => vec![0x10, 0x80, 0x10, 0x80],
        };
        FlatSynthesizer::with_pattern(format, pattern)
    }

    /// Returns a synthesizer repeating `pattern` over the whole buffer
    pub fn with_pattern(format: PixelFormat, pattern: Vec<u8>) -> Self {
        FlatSynthesizer {
            format,
            width: 0,
            height: 0,
            buffer_len: None,
            pattern,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_attached(&self) -> bool {
        self.buffer_len.is_some()
    }
}

impl ImageSynthesizer for FlatSynthesizer {
    fn set_image_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_buffer(&mut self, len: Option<usize>) {
        self.buffer_len = len;
    }

    fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    fn synthesize(&mut self, buffer: &mut [u8]) {
        let len = match self.buffer_len {
            Some(len) => len.min(buffer.len()),
            None => return,
        };
        if self.pattern.is_empty() {
            return;
        }

        for chunk in buffer[..len].chunks_mut(self.pattern.len()) {
            chunk.copy_from_slice(&self.pattern[..chunk.len()]);
        }
    }
}
