//! Path, rate and timecode helpers.

use std::sync::OnceLock;

use editmark_core::FrameRate;
use regex::Regex;

use crate::error::{OtioError, Result};

fn printf_padding_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%(\d+)d").expect("valid printf padding regex"))
}

fn bracket_padding_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)-").expect("valid bracket padding regex"))
}

/// Normalise a `%0Nd` frame token.
///
/// With `padded` the token is rewritten with the padding of the last number
/// in the path, otherwise it becomes a bare `%d`. Paths without `%` are
/// returned unchanged.
///
/// `plate.%04d.exr` becomes `plate.%d.exr` when not padded.
pub fn reformatted_path(path: &str, padded: bool) -> String {
    if !path.contains('%') {
        return path.to_string();
    }
    let re = printf_padding_regex();
    if padded {
        let padding = path
            .rsplit(|c: char| !c.is_ascii_digit())
            .find(|run| !run.is_empty())
            .and_then(|run| run.parse::<usize>().ok());
        match padding {
            Some(padding) => re
                .replace_all(path, format!("%0{padding}d").as_str())
                .into_owned(),
            None => path.to_string(),
        }
    } else {
        re.replace_all(path, "%d").into_owned()
    }
}

/// Padding of a bracketed frame range path, e.g. 4 for
/// `plate.[0001-1008].exr`. `None` when the path has no brackets.
pub fn padding_from_path(path: &str) -> Option<usize> {
    if !path.contains('[') {
        return None;
    }
    bracket_padding_regex()
        .captures_iter(path)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().len())
}

/// Rate of an item as written to interchange files. Integral rates are
/// exact, others are rounded to four decimals.
pub fn get_rate(rate: Option<FrameRate>) -> Option<f64> {
    rate.and_then(FrameRate::interchange_fps)
}

fn nominal_fps(fps: f64) -> Result<i64> {
    let nominal = fps.round() as i64;
    if nominal <= 0 {
        return Err(OtioError::InvalidRate(format!("{fps} fps")));
    }
    Ok(nominal)
}

/// Non-drop-frame `HH:MM:SS:FF` timecode to a frame count.
pub fn timecode_to_frames(timecode: &str, fps: f64) -> Result<i64> {
    let fps = nominal_fps(fps)?;
    let fields: Vec<i64> = timecode
        .split(|c: char| c == ':' || c == ';')
        .map(|part| part.parse::<i64>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| OtioError::InvalidTimecode(timecode.to_string()))?;
    let [hours, minutes, seconds, frames] = fields[..] else {
        return Err(OtioError::InvalidTimecode(timecode.to_string()));
    };
    if minutes >= 60 || seconds >= 60 || frames >= fps {
        return Err(OtioError::InvalidTimecode(timecode.to_string()));
    }
    Ok(((hours * 60 + minutes) * 60 + seconds) * fps + frames)
}

/// Frame count to non-drop-frame `HH:MM:SS:FF` timecode.
pub fn frames_to_timecode(frames: i64, fps: f64) -> Result<String> {
    let fps = nominal_fps(fps)?;
    let sign = if frames < 0 { "-" } else { "" };
    let frames = frames.abs();
    let ff = frames % fps;
    let total_seconds = frames / fps;
    Ok(format!(
        "{sign}{:02}:{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        ff
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reformatted_path() {
        assert_eq!(reformatted_path("/plates/plate.%04d.exr", false), "/plates/plate.%d.exr");
        assert_eq!(reformatted_path("/plates/plate.%04d.exr", true), "/plates/plate.%04d.exr");
        assert_eq!(reformatted_path("/plates/plate.mov", false), "/plates/plate.mov");
    }

    #[test]
    fn test_padding_from_path() {
        assert_eq!(padding_from_path("plate.[0001-1008].exr"), Some(4));
        assert_eq!(padding_from_path("plate.[001-100].exr"), Some(3));
        assert_eq!(padding_from_path("plate.%04d.exr"), None);
    }

    #[test]
    fn test_get_rate() {
        assert_eq!(get_rate(Some(FrameRate::FPS_24)), Some(24.0));
        assert_eq!(get_rate(Some(FrameRate::FPS_23_976)), Some(23.976));
        assert_eq!(get_rate(Some(FrameRate::new(24, 0))), None);
        assert_eq!(get_rate(None), None);
    }

    #[test]
    fn test_timecode() {
        assert_eq!(timecode_to_frames("01:00:00:00", 24.0).unwrap(), 86_400);
        assert_eq!(frames_to_timecode(86_401, 24.0).unwrap(), "01:00:00:01");
        assert_eq!(frames_to_timecode(25, 25.0).unwrap(), "00:00:01:00");
        assert!(timecode_to_frames("00:00:00:30", 25.0).is_err());
        assert!(timecode_to_frames("bad", 25.0).is_err());
    }

    proptest! {
        #[test]
        fn test_timecode_roundtrip(frames in 0i64..10_000_000, fps in prop::sample::select(vec![24.0, 25.0, 30.0, 60.0])) {
            let tc = frames_to_timecode(frames, fps).unwrap();
            prop_assert_eq!(timecode_to_frames(&tc, fps).unwrap(), frames);
        }
    }
}
