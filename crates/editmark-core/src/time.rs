//! Frame-based time representation.
//!
//! Host timelines address everything in whole frames, so ranges are plain
//! inclusive `i64` pairs. Frame rates stay rational so integral rates can be
//! told apart from NTSC-style rates without float comparisons.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EditMarkError, Result};

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Build a frame rate from a floating point fps value.
    ///
    /// Well-known NTSC rates map back onto their exact `x000/1001` form,
    /// anything else is approximated with a millisecond denominator.
    pub fn from_fps(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(EditMarkError::InvalidParameter(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        if fps.fract() == 0.0 {
            return Ok(Self::new(fps as u32, 1));
        }
        for ntsc in [Self::FPS_23_976, Self::FPS_29_97, Self::FPS_59_94] {
            if (ntsc.to_fps_f64() - fps).abs() < 0.001 {
                return Ok(ntsc);
            }
        }
        let ratio = Rational64::new((fps * 1000.0).round() as i64, 1000);
        Ok(Self::new(*ratio.numer() as u32, *ratio.denom() as u32))
    }

    /// The rate as an exact rational.
    #[inline]
    pub fn as_rational(self) -> Rational64 {
        Rational64::new(self.numerator as i64, self.denominator.max(1) as i64)
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// True when the rate is a whole number of frames per second.
    pub fn is_integral(self) -> bool {
        self.denominator != 0 && self.as_rational().is_integer()
    }

    /// Rate as handed to interchange formats: integral rates exact, others
    /// rounded to four decimals. `None` for a zero denominator.
    pub fn interchange_fps(self) -> Option<f64> {
        if self.denominator == 0 {
            return None;
        }
        if self.is_integral() {
            return Some(self.as_rational().to_integer() as f64);
        }
        Some((self.to_fps_f64() * 10_000.0).round() / 10_000.0)
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_50: Self = Self::new(50, 1);
    pub const FPS_59_94: Self = Self::new(60000, 1001);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_24
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// An inclusive range of timeline frames, `clip_in..=clip_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame (inclusive)
    pub clip_in: i64,
    /// Last frame (inclusive)
    pub clip_out: i64,
}

impl FrameRange {
    /// Create a new range from inclusive in/out frames.
    #[inline]
    pub const fn new(clip_in: i64, clip_out: i64) -> Self {
        Self { clip_in, clip_out }
    }

    /// Number of frames in the range.
    #[inline]
    pub fn duration(self) -> i64 {
        self.clip_out - self.clip_in + 1
    }

    /// Check whether a single frame falls within the range.
    #[inline]
    pub fn contains_frame(self, frame: i64) -> bool {
        frame >= self.clip_in && frame <= self.clip_out
    }

    /// Check whether `other` lies entirely within this range.
    ///
    /// This is the containment test used to find the hero range a
    /// dependent clip belongs to.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.clip_in <= other.clip_in && other.clip_out <= self.clip_out
    }

    /// Extend the range by handles on both sides.
    pub fn with_handles(self, handle_start: i64, handle_end: i64) -> Self {
        Self::new(self.clip_in - handle_start, self.clip_out + handle_end)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{}]", self.clip_in, self.clip_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rate_23_976() {
        let rate = FrameRate::FPS_23_976;
        let fps = rate.to_fps_f64();
        assert!((fps - 23.976).abs() < 0.001);
        assert!(!rate.is_integral());
    }

    #[test]
    fn test_interchange_fps() {
        assert_eq!(FrameRate::FPS_25.interchange_fps(), Some(25.0));
        assert_eq!(FrameRate::FPS_23_976.interchange_fps(), Some(23.976));
        assert_eq!(FrameRate::FPS_29_97.interchange_fps(), Some(29.97));
        assert_eq!(FrameRate::new(24, 0).interchange_fps(), None);
    }

    #[test]
    fn test_from_fps() {
        assert_eq!(FrameRate::from_fps(25.0).unwrap(), FrameRate::FPS_25);
        assert_eq!(FrameRate::from_fps(23.976).unwrap(), FrameRate::FPS_23_976);
        assert_eq!(FrameRate::from_fps(12.5).unwrap(), FrameRate::new(25, 2));
        assert!(FrameRate::from_fps(0.0).is_err());
        assert!(FrameRate::from_fps(f64::NAN).is_err());
    }

    #[test]
    fn test_frame_rate_display() {
        assert_eq!(FrameRate::FPS_24.to_string(), "24 fps");
        assert_eq!(FrameRate::FPS_29_97.to_string(), "29.970 fps");
    }

    #[test]
    fn test_frame_range_duration_is_inclusive() {
        let range = FrameRange::new(1000, 1100);
        assert_eq!(range.duration(), 101);
        assert!(range.contains_frame(1000));
        assert!(range.contains_frame(1100));
        assert!(!range.contains_frame(1101));
    }

    #[test]
    fn test_frame_range_containment() {
        let hero = FrameRange::new(100, 150);
        assert!(hero.contains(FrameRange::new(100, 150)));
        assert!(hero.contains(FrameRange::new(110, 140)));
        assert!(!hero.contains(FrameRange::new(90, 140)));
        assert!(!hero.contains(FrameRange::new(110, 151)));
    }

    #[test]
    fn test_with_handles() {
        let range = FrameRange::new(1001, 1050).with_handles(10, 5);
        assert_eq!(range, FrameRange::new(991, 1055));
    }
}
