use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Fraction of a second, used for frame intervals
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    /// Returns a fraction representation
    ///
    /// # Arguments
    ///
    /// * `num` - Numerator
    /// * `denom` - Denominator
    ///
    /// # Example
    ///
    /// ```
    /// use capsim::Fraction;
    /// let interval = Fraction::new(1, 30);
    /// ```
    pub fn new(num: u32, denom: u32) -> Self {
        Fraction {
            numerator: num,
            denominator: denom,
        }
    }

    /// Returns the interval between frames at a given rate
    pub fn per_second(fps: u32) -> Self {
        Fraction::new(1, fps)
    }

    /// Converts the fraction to a duration
    ///
    /// Returns `None` for a zero denominator.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use capsim::Fraction;
    ///
    /// let interval = Fraction::new(1, 40).to_duration();
    /// assert_eq!(interval, Some(Duration::from_millis(25)));
    /// ```
    pub fn to_duration(self) -> Option<Duration> {
        if self.denominator == 0 {
            return None;
        }

        let nanos = u64::from(self.numerator) * 1_000_000_000 / u64::from(self.denominator);
        Some(Duration::from_nanos(nanos))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_interval() {
        let interval = Fraction::new(1001, 30000).to_duration().unwrap();
        assert_eq!(interval.as_nanos(), 33_366_666);
    }

    #[test]
    fn zero_denominator_has_no_duration() {
        assert_eq!(Fraction::new(1, 0).to_duration(), None);
        assert_eq!(Fraction::per_second(0).to_duration(), None);
    }
}
