//! Frame-range overlap classification.
//!
//! All comparisons are edge-inclusive on the inclusive `clip_in`/`clip_out`
//! frames of [`FrameRange`].

use serde::{Deserialize, Serialize};

use crate::time::FrameRange;

/// How a test range relates to a reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overlap {
    /// Test starts at or before the reference and ends at or after it.
    Covering,
    /// Test lies entirely within the reference.
    Inside,
    /// Test starts before the reference out and runs past its right edge.
    OverlappingRight,
    /// Test ends after the reference in and starts at or before its left edge.
    OverlappingLeft,
}

impl Overlap {
    /// Classify `test` against `reference`, first match wins in
    /// covering / inside / right / left order.
    pub fn classify(test: FrameRange, reference: FrameRange) -> Option<Self> {
        if covers(test, reference) {
            Some(Self::Covering)
        } else if test.clip_in >= reference.clip_in && test.clip_out <= reference.clip_out {
            Some(Self::Inside)
        } else if overlaps_right(test, reference) {
            Some(Self::OverlappingRight)
        } else if overlaps_left(test, reference) {
            Some(Self::OverlappingLeft)
        } else {
            None
        }
    }
}

#[inline]
fn covers(test: FrameRange, reference: FrameRange) -> bool {
    test.clip_in <= reference.clip_in && test.clip_out >= reference.clip_out
}

#[inline]
fn overlaps_right(test: FrameRange, reference: FrameRange) -> bool {
    test.clip_in < reference.clip_out && test.clip_out >= reference.clip_out
}

#[inline]
fn overlaps_left(test: FrameRange, reference: FrameRange) -> bool {
    test.clip_out > reference.clip_in && test.clip_in <= reference.clip_in
}

/// Overlap predicate between two frame ranges.
///
/// With `strict` only full coverage of `reference` counts. Otherwise any of
/// covering, inside, right-edge or left-edge overlap is accepted.
pub fn is_overlapping(test: FrameRange, reference: FrameRange, strict: bool) -> bool {
    if strict {
        return covers(test, reference);
    }
    Overlap::classify(test, reference).is_some()
}

/// Overlap predicate used to assign sub-track effects to a clip.
///
/// An effect sitting strictly inside a clip does not drive the clip, so only
/// covering and edge overlaps count here.
pub fn effect_overlaps(effect: FrameRange, clip: FrameRange) -> bool {
    covers(effect, clip) || overlaps_right(effect, clip) || overlaps_left(effect, clip)
}
