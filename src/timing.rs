//! Frame index to elapsed-time mapping.
//!
//! Two clocks are supported:
//! - `ConstantFps`: the source reports a usable frame rate (local files).
//! - `AverageDuration`: only the total duration is known (streamed sources),
//!   so every frame is assumed to last `duration / frame_count` seconds.
//!
//! The average-duration clock is a linear approximation. It drifts from true
//! elapsed time on variable frame rate sources, and existing summaries depend
//! on that exact approximation.

use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Maps a 1-based frame index to seconds since the start of the video.
pub trait FrameClock {
    fn timestamp_for(&self, frame_index: u64) -> f64;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantFps {
    fps: f64,
}

impl ConstantFps {
    pub fn new(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(anyhow!(
                "frame rate must be positive to derive timestamps (got {})",
                fps
            ));
        }
        Ok(Self { fps })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl FrameClock for ConstantFps {
    fn timestamp_for(&self, frame_index: u64) -> f64 {
        frame_index as f64 / self.fps
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AverageDuration {
    seconds_per_frame: f64,
}

impl AverageDuration {
    pub fn new(duration_secs: f64, frame_count: u64) -> Result<Self> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(anyhow!(
                "video duration must be a non-negative number of seconds (got {})",
                duration_secs
            ));
        }
        if frame_count == 0 {
            return Err(anyhow!("average frame duration needs at least one frame"));
        }
        Ok(Self {
            seconds_per_frame: duration_secs / frame_count as f64,
        })
    }

    pub fn seconds_per_frame(&self) -> f64 {
        self.seconds_per_frame
    }
}

impl FrameClock for AverageDuration {
    fn timestamp_for(&self, frame_index: u64) -> f64 {
        frame_index as f64 * self.seconds_per_frame
    }
}

fn iso_duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("static duration pattern")
    })
}

/// Parse a video duration.
///
/// Accepts ISO-8601 durations as reported by video platform metadata
/// (`PT4M13S`, `P1DT2H`, `PT0.5S`) or a plain number of seconds.
pub fn parse_duration(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        bail!("empty duration");
    }
    if let Ok(seconds) = text.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            bail!("duration must be a non-negative number of seconds: {}", text);
        }
        return Ok(seconds);
    }

    let upper = text.to_ascii_uppercase();
    let caps = iso_duration_pattern()
        .captures(&upper)
        .ok_or_else(|| anyhow!("unrecognised duration '{}'", text))?;
    if upper == "P" || upper.ends_with('T') {
        bail!("duration '{}' has no components", text);
    }

    const UNITS: [f64; 5] = [604_800.0, 86_400.0, 3_600.0, 60.0, 1.0];
    let mut total = 0.0;
    for (group, unit) in UNITS.iter().enumerate() {
        if let Some(value) = caps.get(group + 1) {
            let value: f64 = value
                .as_str()
                .parse()
                .map_err(|_| anyhow!("invalid duration component in '{}'", text))?;
            total += value * unit;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_fps_divides_frame_index() {
        let clock = ConstantFps::new(2.0).unwrap();
        assert_eq!(clock.timestamp_for(1), 0.5);
        assert_eq!(clock.timestamp_for(6), 3.0);
    }

    #[test]
    fn constant_fps_rejects_non_positive_rate() {
        assert!(ConstantFps::new(0.0).is_err());
        assert!(ConstantFps::new(-25.0).is_err());
        assert!(ConstantFps::new(f64::NAN).is_err());
    }

    #[test]
    fn average_duration_scales_frame_index() {
        let clock = AverageDuration::new(10.0, 4).unwrap();
        assert_eq!(clock.seconds_per_frame(), 2.5);
        assert_eq!(clock.timestamp_for(1), 2.5);
        assert_eq!(clock.timestamp_for(4), 10.0);
    }

    #[test]
    fn average_duration_needs_frames() {
        assert!(AverageDuration::new(10.0, 0).is_err());
        assert!(AverageDuration::new(-1.0, 10).is_err());
    }

    #[test]
    fn parses_iso_and_plain_durations() {
        assert_eq!(parse_duration("PT4M13S").unwrap(), 253.0);
        assert_eq!(parse_duration("P1DT2H").unwrap(), 93_600.0);
        assert_eq!(parse_duration("PT0.5S").unwrap(), 0.5);
        assert_eq!(parse_duration("pt1h").unwrap(), 3_600.0);
        assert_eq!(parse_duration("42.5").unwrap(), 42.5);
    }

    #[test]
    fn rejects_malformed_durations() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("P").is_err());
        assert!(parse_duration("PT").is_err());
        assert!(parse_duration("4 minutes").is_err());
        assert!(parse_duration("-3").is_err());
    }
}
