use std::{fmt, str};

use serde::{Deserialize, Serialize};

/// Four character code naming the pixel layout of a frame
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    /// Packed 24-bit RGB, one byte per channel
    pub const RGB3: FourCC = FourCC::new(b"RGB3");
    /// Packed 4:2:2 YUV, two bytes per pixel
    pub const YUYV: FourCC = FourCC::new(b"YUYV");

    /// Returns a four character code from its raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use capsim::format::FourCC;
    /// let fourcc = FourCC::new(b"RGB3");
    /// assert_eq!(fourcc, FourCC::RGB3);
    /// ```
    pub const fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the code as a string slice, if it is valid UTF-8
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.str() {
            Ok(code) => f.write_str(code),
            Err(_) => write!(f, "{:#010x}", u32::from(*self)),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        Self::from_le_bytes(fourcc.repr)
    }
}
