//! Animation presets for the app's animated components
//!
//! Pre-built descriptors for floating icons, shimmering buttons, pulsing
//! rings, twinkling background elements and progress bars. Every preset
//! animates an `f32` and is valid by construction.

use std::fmt;
use std::str::FromStr;

use crate::descriptor::AnimationDescriptor;
use crate::easing::Easing;

/// Shortest segment a preset will emit
const MIN_SEGMENT_MS: u32 = 1;

fn half(duration_ms: u32) -> u32 {
    (duration_ms / 2).max(MIN_SEGMENT_MS)
}

/// Pre-built animation presets for common patterns
pub struct AnimationPreset;

impl AnimationPreset {
    // ========================================================================
    // Looping
    // ========================================================================

    /// Bob between the current offset and `amplitude`, forever
    ///
    /// One full up-and-back cycle takes `period_ms`.
    pub fn float(amplitude: f32, period_ms: u32) -> AnimationDescriptor<f32> {
        AnimationDescriptor::timing(amplitude, half(period_ms), Easing::EaseInOut)
            .repeat_forever(true)
    }

    /// Sweep a highlight from 0 to 1, hold for `pause_ms`, restart
    ///
    /// Drives a shimmer gradient position; start the value at 0.
    pub fn shimmer(sweep_ms: u32, pause_ms: u32) -> AnimationDescriptor<f32> {
        let sweep = AnimationDescriptor::timing(1.0, sweep_ms.max(MIN_SEGMENT_MS), Easing::EaseInOut);
        let cycle = if pause_ms == 0 {
            sweep
        } else {
            sweep.then(AnimationDescriptor::linear(1.0, pause_ms))
        };
        cycle.repeat_forever(false)
    }

    /// Scale up to `peak_scale` and back, forever
    pub fn pulse(peak_scale: f32, duration_ms: u32) -> AnimationDescriptor<f32> {
        AnimationDescriptor::timing(peak_scale, half(duration_ms), Easing::EaseInOutSine)
            .repeat_forever(true)
    }

    /// Wait `delay_ms`, settle at `min`, then ping-pong opacity to `max` forever
    ///
    /// Stagger `delay_ms` across elements so they don't blink in unison.
    pub fn twinkle(delay_ms: u32, min: f32, max: f32, period_ms: u32) -> AnimationDescriptor<f32> {
        let step = half(period_ms);
        let twinkle = AnimationDescriptor::timing(min, step, Easing::EaseOut).then(
            AnimationDescriptor::timing(max, step, Easing::EaseInOutSine).repeat_forever(true),
        );
        if delay_ms == 0 {
            twinkle
        } else {
            twinkle.delayed(delay_ms)
        }
    }

    /// Fill to `fraction` (clamped to `[0, 1]`) once
    pub fn progress(fraction: f32, duration_ms: u32) -> AnimationDescriptor<f32> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        AnimationDescriptor::timing(fraction, duration_ms.max(MIN_SEGMENT_MS), Easing::EaseOutCubic)
    }

    // ========================================================================
    // Fade animations
    // ========================================================================

    /// Fade in to opaque
    pub fn fade_in(duration_ms: u32) -> AnimationDescriptor<f32> {
        AnimationDescriptor::timing(1.0, duration_ms.max(MIN_SEGMENT_MS), Easing::EaseOut)
    }

    /// Fade out to transparent
    pub fn fade_out(duration_ms: u32) -> AnimationDescriptor<f32> {
        AnimationDescriptor::timing(0.0, duration_ms.max(MIN_SEGMENT_MS), Easing::EaseIn)
    }

    /// Preset with its default parameters, by name
    pub fn from_name(name: &str) -> Result<PresetSpec, UnknownPreset> {
        name.parse()
    }

    /// Names accepted by [`from_name`](Self::from_name)
    pub fn names() -> &'static [&'static str] {
        &PRESET_NAMES
    }
}

const PRESET_NAMES: [&str; 7] = [
    "float", "shimmer", "pulse", "twinkle", "progress", "fade_in", "fade_out",
];

/// Returned when a preset name does not match any preset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown animation preset '{0}'")]
pub struct UnknownPreset(pub String);

/// A preset with its parameters, as written in configuration
///
/// ```toml
/// preset = { kind = "float", amplitude = 8.0, period_ms = 1200 }
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum PresetSpec {
    Float { amplitude: f32, period_ms: u32 },
    Shimmer { sweep_ms: u32, pause_ms: u32 },
    Pulse { peak_scale: f32, duration_ms: u32 },
    Twinkle {
        delay_ms: u32,
        min: f32,
        max: f32,
        period_ms: u32,
    },
    Progress { fraction: f32, duration_ms: u32 },
    FadeIn { duration_ms: u32 },
    FadeOut { duration_ms: u32 },
}

impl PresetSpec {
    pub fn name(&self) -> &'static str {
        match self {
            PresetSpec::Float { .. } => "float",
            PresetSpec::Shimmer { .. } => "shimmer",
            PresetSpec::Pulse { .. } => "pulse",
            PresetSpec::Twinkle { .. } => "twinkle",
            PresetSpec::Progress { .. } => "progress",
            PresetSpec::FadeIn { .. } => "fade_in",
            PresetSpec::FadeOut { .. } => "fade_out",
        }
    }

    /// Build the descriptor
    pub fn descriptor(&self) -> AnimationDescriptor<f32> {
        match *self {
            PresetSpec::Float {
                amplitude,
                period_ms,
            } => AnimationPreset::float(amplitude, period_ms),
            PresetSpec::Shimmer { sweep_ms, pause_ms } => AnimationPreset::shimmer(sweep_ms, pause_ms),
            PresetSpec::Pulse {
                peak_scale,
                duration_ms,
            } => AnimationPreset::pulse(peak_scale, duration_ms),
            PresetSpec::Twinkle {
                delay_ms,
                min,
                max,
                period_ms,
            } => AnimationPreset::twinkle(delay_ms, min, max, period_ms),
            PresetSpec::Progress {
                fraction,
                duration_ms,
            } => AnimationPreset::progress(fraction, duration_ms),
            PresetSpec::FadeIn { duration_ms } => AnimationPreset::fade_in(duration_ms),
            PresetSpec::FadeOut { duration_ms } => AnimationPreset::fade_out(duration_ms),
        }
    }
}

impl FromStr for PresetSpec {
    type Err = UnknownPreset;

    /// Default parameters for each preset; kebab or snake case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "float" => PresetSpec::Float {
                amplitude: 8.0,
                period_ms: 1200,
            },
            "shimmer" => PresetSpec::Shimmer {
                sweep_ms: 900,
                pause_ms: 600,
            },
            "pulse" => PresetSpec::Pulse {
                peak_scale: 1.15,
                duration_ms: 1000,
            },
            "twinkle" => PresetSpec::Twinkle {
                delay_ms: 0,
                min: 0.2,
                max: 1.0,
                period_ms: 1600,
            },
            "progress" => PresetSpec::Progress {
                fraction: 1.0,
                duration_ms: 800,
            },
            "fade_in" => PresetSpec::FadeIn { duration_ms: 200 },
            "fade_out" => PresetSpec::FadeOut { duration_ms: 200 },
            _ => return Err(UnknownPreset(s.to_string())),
        };
        Ok(spec)
    }
}

impl fmt::Display for PresetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetSpec::Float {
                amplitude,
                period_ms,
            } => write!(f, "float(amplitude={amplitude}, period_ms={period_ms})"),
            PresetSpec::Shimmer { sweep_ms, pause_ms } => {
                write!(f, "shimmer(sweep_ms={sweep_ms}, pause_ms={pause_ms})")
            }
            PresetSpec::Pulse {
                peak_scale,
                duration_ms,
            } => write!(f, "pulse(peak_scale={peak_scale}, duration_ms={duration_ms})"),
            PresetSpec::Twinkle {
                delay_ms,
                min,
                max,
                period_ms,
            } => write!(
                f,
                "twinkle(delay_ms={delay_ms}, min={min}, max={max}, period_ms={period_ms})"
            ),
            PresetSpec::Progress {
                fraction,
                duration_ms,
            } => write!(f, "progress(fraction={fraction}, duration_ms={duration_ms})"),
            PresetSpec::FadeIn { duration_ms } => write!(f, "fade_in(duration_ms={duration_ms})"),
            PresetSpec::FadeOut { duration_ms } => write!(f, "fade_out(duration_ms={duration_ms})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{Timeline, TimelinePhase};

    fn run(desc: AnimationDescriptor<f32>, start: f32, ms: f64) -> (f32, TimelinePhase) {
        let mut value = start;
        let mut tl = Timeline::compile(desc, start).unwrap();
        let phase = tl.advance(ms, &mut value);
        (value, phase)
    }

    #[test]
    fn test_every_named_preset_is_valid() {
        for name in AnimationPreset::names() {
            let spec = AnimationPreset::from_name(name).unwrap();
            assert_eq!(spec.name(), *name);
            assert!(spec.descriptor().validate().is_ok(), "{name}");
        }
        assert_eq!(
            AnimationPreset::from_name("wobble"),
            Err(UnknownPreset("wobble".to_string()))
        );
        assert!(AnimationPreset::from_name("fade-in").is_ok());
    }

    #[test]
    fn test_float_ping_pongs() {
        let float = AnimationPreset::float(8.0, 1000);
        assert_eq!(float.duration_ms(), None);
        assert_eq!(run(float.clone(), 0.0, 500.0), (8.0, TimelinePhase::Reversed));
        assert_eq!(run(float, 0.0, 1000.0).0, 0.0);
    }

    #[test]
    fn test_shimmer_holds_then_restarts() {
        let shimmer = AnimationPreset::shimmer(100, 50);
        assert_eq!(run(shimmer.clone(), 0.0, 120.0).0, 1.0);
        let (value, phase) = run(shimmer, 0.0, 175.0);
        assert!(value > 0.0 && value < 1.0);
        assert_eq!(phase, TimelinePhase::Running);
    }

    #[test]
    fn test_twinkle_waits_then_oscillates() {
        let twinkle = AnimationPreset::twinkle(300, 0.2, 1.0, 400);
        assert_eq!(run(twinkle.clone(), 0.6, 250.0).0, 0.6);
        assert_eq!(run(twinkle.clone(), 0.6, 500.0).0, 0.2);
        assert_eq!(run(twinkle.clone(), 0.6, 700.0).0, 1.0);
        assert_eq!(run(twinkle, 0.6, 900.0).0, 0.2);
    }

    #[test]
    fn test_progress_clamps_fraction() {
        assert_eq!(run(AnimationPreset::progress(1.4, 100), 0.0, 100.0), (1.0, TimelinePhase::Completed));
        assert_eq!(run(AnimationPreset::progress(f32::NAN, 100), 0.5, 100.0).0, 0.0);
    }

    #[test]
    fn test_zero_durations_stay_valid() {
        assert!(AnimationPreset::fade_in(0).validate().is_ok());
        assert!(AnimationPreset::pulse(1.2, 0).validate().is_ok());
        assert!(AnimationPreset::shimmer(0, 0).validate().is_ok());
    }

    #[test]
    fn test_display() {
        let spec = PresetSpec::FadeOut { duration_ms: 150 };
        assert_eq!(spec.to_string(), "fade_out(duration_ms=150)");
    }
}
