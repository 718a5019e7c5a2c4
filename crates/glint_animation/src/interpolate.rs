//! Piecewise-linear range mapping
//!
//! Maps a progress value through `input_range -> output_range` breakpoints,
//! the way render code turns a shared value into rotation, offset or colour.
//! Output saturates at both ends; there is no extrapolation.

use crate::values::{mix, Interpolate};

/// Invalid breakpoint ranges
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeMismatchError {
    #[error("input range has {input} breakpoints but output range has {output}")]
    LengthMismatch { input: usize, output: usize },
    #[error("at least 2 breakpoints are required, got {0}")]
    TooFewBreakpoints(usize),
    #[error("input range must be finite and strictly increasing (breakpoint {index})")]
    NotIncreasing { index: usize },
}

/// Interpolate `progress` through the given ranges
///
/// ```
/// use glint_animation::interpolate;
///
/// let deg = interpolate(0.5, &[0.0, 1.0], &[0.0f32, 360.0]).unwrap();
/// assert_eq!(deg, 180.0);
/// ```
pub fn interpolate<T: Interpolate>(
    progress: f32,
    input_range: &[f32],
    output_range: &[T],
) -> Result<T, RangeMismatchError> {
    validate(input_range, output_range.len())?;
    Ok(sample(progress, input_range, output_range))
}

fn validate(input: &[f32], output_len: usize) -> Result<(), RangeMismatchError> {
    if input.len() != output_len {
        return Err(RangeMismatchError::LengthMismatch {
            input: input.len(),
            output: output_len,
        });
    }
    if input.len() < 2 {
        return Err(RangeMismatchError::TooFewBreakpoints(input.len()));
    }
    if let Some(index) = input.iter().position(|x| !x.is_finite()) {
        return Err(RangeMismatchError::NotIncreasing { index });
    }
    if let Some(index) = input.windows(2).position(|w| w[1] <= w[0]) {
        return Err(RangeMismatchError::NotIncreasing { index: index + 1 });
    }
    Ok(())
}

/// Assumes validated ranges
fn sample<T: Interpolate>(progress: f32, input: &[f32], output: &[T]) -> T {
    let last = input.len() - 1;
    if progress.is_nan() || progress <= input[0] {
        return output[0].clone();
    }
    if progress >= input[last] {
        return output[last].clone();
    }

    // First breakpoint strictly greater than progress closes the segment
    let hi = input.partition_point(|&x| x <= progress);
    let lo = hi - 1;
    let t = (progress - input[lo]) / (input[hi] - input[lo]);
    mix(&output[lo], &output[hi], t)
}

/// A validated mapping, for values sampled every frame
#[derive(Clone, Debug)]
pub struct Interpolator<T: Interpolate> {
    input: Vec<f32>,
    output: Vec<T>,
}

impl<T: Interpolate> Interpolator<T> {
    pub fn new(
        input: impl Into<Vec<f32>>,
        output: impl Into<Vec<T>>,
    ) -> Result<Self, RangeMismatchError> {
        let input = input.into();
        let output = output.into();
        validate(&input, output.len())?;
        Ok(Self { input, output })
    }

    /// Map a progress value; never fails once constructed
    pub fn at(&self, progress: f32) -> T {
        sample(progress, &self.input, &self.output)
    }

    pub fn input_range(&self) -> &[f32] {
        &self.input
    }

    pub fn output_range(&self) -> &[T] {
        &self.output
    }
}
