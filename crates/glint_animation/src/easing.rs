//! Easing functions for animations
//!
//! Every curve maps normalized progress in `[0, 1]` to eased progress in
//! `[0, 1]`, with `apply(0) == 0` and `apply(1) == 1`.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Easing function type
///
/// Scene files name curves in snake_case or kebab-case, like `FromStr`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Easing {
    #[default]
    Linear,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in"))]
    EaseIn,
    #[cfg_attr(feature = "serde", serde(alias = "ease-out"))]
    EaseOut,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-out"))]
    EaseInOut,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-quad"))]
    EaseInQuad,
    #[cfg_attr(feature = "serde", serde(alias = "ease-out-quad"))]
    EaseOutQuad,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-out-quad"))]
    EaseInOutQuad,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-cubic"))]
    EaseInCubic,
    #[cfg_attr(feature = "serde", serde(alias = "ease-out-cubic"))]
    EaseOutCubic,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-out-cubic"))]
    EaseInOutCubic,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-quart"))]
    EaseInQuart,
    #[cfg_attr(feature = "serde", serde(alias = "ease-out-quart"))]
    EaseOutQuart,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-out-quart"))]
    EaseInOutQuart,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-sine"))]
    EaseInSine,
    #[cfg_attr(feature = "serde", serde(alias = "ease-out-sine"))]
    EaseOutSine,
    #[cfg_attr(feature = "serde", serde(alias = "ease-in-out-sine"))]
    EaseInOutSine,
    #[cfg_attr(feature = "serde", serde(alias = "cubic-bezier"))]
    CubicBezier(f32, f32, f32, f32),
}

/// Every named (non-parametric) curve, in declaration order
const NAMED: [Easing; 16] = [
    Easing::Linear,
    Easing::EaseIn,
    Easing::EaseOut,
    Easing::EaseInOut,
    Easing::EaseInQuad,
    Easing::EaseOutQuad,
    Easing::EaseInOutQuad,
    Easing::EaseInCubic,
    Easing::EaseOutCubic,
    Easing::EaseInOutCubic,
    Easing::EaseInQuart,
    Easing::EaseOutQuart,
    Easing::EaseInOutQuart,
    Easing::EaseInSine,
    Easing::EaseOutSine,
    Easing::EaseInOutSine,
];

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    ///
    /// Input is clamped to `[0, 1]` and the endpoints are exact.
    pub fn apply(&self, t: f32) -> f32 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        let eased = match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t * t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::EaseOutSine => (t * PI / 2.0).sin(),
            Easing::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
        };

        // Float noise near the ends must not escape the unit interval.
        eased.clamp(0.0, 1.0)
    }

    /// Whether this curve honours the `[0, 1] -> [0, 1]` contract
    ///
    /// Only `CubicBezier` can fail: all four control coordinates must be
    /// finite and inside `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        match self {
            Easing::CubicBezier(x1, y1, x2, y2) => [x1, y1, x2, y2]
                .iter()
                .all(|c| c.is_finite() && (0.0..=1.0).contains(*c)),
            _ => true,
        }
    }

    /// Configuration name of a named curve (`None` for `CubicBezier`)
    pub fn name(&self) -> Option<&'static str> {
        let name = match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease-in",
            Easing::EaseOut => "ease-out",
            Easing::EaseInOut => "ease-in-out",
            Easing::EaseInQuad => "ease-in-quad",
            Easing::EaseOutQuad => "ease-out-quad",
            Easing::EaseInOutQuad => "ease-in-out-quad",
            Easing::EaseInCubic => "ease-in-cubic",
            Easing::EaseOutCubic => "ease-out-cubic",
            Easing::EaseInOutCubic => "ease-in-out-cubic",
            Easing::EaseInQuart => "ease-in-quart",
            Easing::EaseOutQuart => "ease-out-quart",
            Easing::EaseInOutQuart => "ease-in-out-quart",
            Easing::EaseInSine => "ease-in-sine",
            Easing::EaseOutSine => "ease-out-sine",
            Easing::EaseInOutSine => "ease-in-out-sine",
            Easing::CubicBezier(..) => return None,
        };
        Some(name)
    }

    /// All named curves
    pub fn named() -> &'static [Easing] {
        &NAMED
    }
}

/// Returned when an easing name does not match any named curve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown easing function '{0}'")]
pub struct UnknownEasing(pub String);

impl FromStr for Easing {
    type Err = UnknownEasing;

    /// Accepts kebab-case (`ease-in-out`) and snake_case (`ease_in_out`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        NAMED
            .iter()
            .copied()
            .find(|e| e.name() == Some(normalized.as_str()))
            .ok_or_else(|| UnknownEasing(s.to_string()))
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            named => f.write_str(named.name().unwrap_or("cubic-bezier")),
        }
    }
}

/// Cubic bezier easing calculation (matches CSS / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search always converges
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³, in Horner form
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_curves() -> Vec<Easing> {
        let mut curves = Easing::named().to_vec();
        curves.push(Easing::CubicBezier(0.25, 0.1, 0.25, 1.0));
        curves.push(Easing::CubicBezier(0.42, 0.0, 0.58, 1.0));
        curves
    }

    #[test]
    fn test_endpoints_are_exact() {
        for easing in all_curves() {
            assert_eq!(easing.apply(0.0), 0.0, "{easing} at 0");
            assert_eq!(easing.apply(1.0), 1.0, "{easing} at 1");
        }
    }

    #[test]
    fn test_output_stays_in_unit_interval() {
        for easing in all_curves() {
            for i in 0..=1000 {
                let t = i as f32 / 1000.0;
                let v = easing.apply(t);
                assert!((0.0..=1.0).contains(&v), "{easing}({t}) = {v}");
            }
        }
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        assert_eq!(Easing::EaseInOut.apply(-0.5), 0.0);
        assert_eq!(Easing::EaseInOut.apply(1.5), 1.0);
        assert_eq!(Easing::Linear.apply(f32::NAN), 0.0);
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        for easing in [Easing::EaseInOut, Easing::EaseInOutSine] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
            let a = easing.apply(0.2);
            let b = easing.apply(0.8);
            assert!((a + b - 1.0).abs() < 1e-5, "{easing}: {a} + {b}");
        }
    }

    #[test]
    fn test_names_round_trip() {
        for easing in Easing::named() {
            let name = easing.name().unwrap();
            assert_eq!(name.parse::<Easing>().unwrap(), *easing);
        }
        assert_eq!("ease_in_out".parse::<Easing>().unwrap(), Easing::EaseInOut);
        assert_eq!(
            "bounce".parse::<Easing>(),
            Err(UnknownEasing("bounce".to_string()))
        );
    }

    #[test]
    fn test_bezier_validation() {
        assert!(Easing::CubicBezier(0.25, 0.1, 0.25, 1.0).is_valid());
        assert!(!Easing::CubicBezier(0.68, -0.55, 0.27, 1.55).is_valid());
        assert!(!Easing::CubicBezier(f32::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(Easing::EaseOutQuart.is_valid());
    }
}
