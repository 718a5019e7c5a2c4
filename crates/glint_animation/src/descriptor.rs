//! Animation descriptors
//!
//! A descriptor is an immutable description of how a value should change
//! over time. Descriptors are plain data: they can be cloned, shared between
//! components and attached to any number of shared values. Attaching one
//! compiles it into a [`Timeline`](crate::timeline::Timeline), which holds
//! all of the mutable run state.
//!
//! # Example
//!
//! ```
//! use glint_animation::{AnimationDescriptor, Easing};
//!
//! // Bob up 8px and back, forever
//! let float = AnimationDescriptor::timing(-8.0f32, 600, Easing::EaseInOut).repeat_forever(true);
//! assert!(float.validate().is_ok());
//! assert_eq!(float.duration_ms(), None);
//! ```

use crate::easing::Easing;
use crate::values::{mix, Interpolate};

/// Maximum nesting depth accepted by [`AnimationDescriptor::validate`]
pub const MAX_DEPTH: usize = 32;

/// Repeat count meaning "forever"
pub const INFINITE: i32 = -1;

/// Structurally invalid descriptor, rejected at attach time
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("sequence has no steps")]
    EmptySequence,
    #[error("timing duration must be greater than zero")]
    NonPositiveDuration,
    #[error("repeat count must be >= 1 or -1 (infinite), got {0}")]
    InvalidRepeatCount(i32),
    #[error("easing {0} does not map [0, 1] onto [0, 1]")]
    InvalidEasing(Easing),
    #[error("descriptor nesting exceeds {max} levels")]
    TooDeep { max: usize },
}

/// How a value should change over time
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnimationDescriptor<T> {
    /// Move from the current value to `target` over `duration_ms`
    Timing {
        target: T,
        duration_ms: u32,
        #[cfg_attr(feature = "serde", serde(default))]
        easing: Easing,
    },
    /// Run steps one after another; each starts where the previous ended
    Sequence { steps: Vec<AnimationDescriptor<T>> },
    /// Run `inner` `count` times (`-1` = forever), optionally ping-ponging
    Repeat {
        inner: Box<AnimationDescriptor<T>>,
        count: i32,
        #[cfg_attr(feature = "serde", serde(default))]
        reverse: bool,
    },
    /// Hold the value for `ms`, then run `inner`
    Delay {
        ms: u32,
        inner: Box<AnimationDescriptor<T>>,
    },
}

impl<T> AnimationDescriptor<T> {
    pub fn timing(target: T, duration_ms: u32, easing: Easing) -> Self {
        AnimationDescriptor::Timing {
            target,
            duration_ms,
            easing,
        }
    }

    /// Timing with linear easing
    pub fn linear(target: T, duration_ms: u32) -> Self {
        Self::timing(target, duration_ms, Easing::Linear)
    }

    pub fn sequence(steps: impl IntoIterator<Item = AnimationDescriptor<T>>) -> Self {
        AnimationDescriptor::Sequence {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn repeat(inner: AnimationDescriptor<T>, count: i32, reverse: bool) -> Self {
        AnimationDescriptor::Repeat {
            inner: Box::new(inner),
            count,
            reverse,
        }
    }

    pub fn delay(ms: u32, inner: AnimationDescriptor<T>) -> Self {
        AnimationDescriptor::Delay {
            ms,
            inner: Box::new(inner),
        }
    }

    /// Builder: run `next` after this one
    ///
    /// Appends to an existing sequence instead of nesting a new one.
    pub fn then(self, next: AnimationDescriptor<T>) -> Self {
        match self {
            AnimationDescriptor::Sequence { mut steps } => {
                steps.push(next);
                AnimationDescriptor::Sequence { steps }
            }
            first => AnimationDescriptor::sequence([first, next]),
        }
    }

    /// Builder: repeat this descriptor `count` times
    pub fn repeated(self, count: i32, reverse: bool) -> Self {
        Self::repeat(self, count, reverse)
    }

    /// Builder: repeat this descriptor forever
    pub fn repeat_forever(self, reverse: bool) -> Self {
        Self::repeat(self, INFINITE, reverse)
    }

    /// Builder: start this descriptor after `ms`
    pub fn delayed(self, ms: u32) -> Self {
        Self::delay(ms, self)
    }

    /// Check the structural rules every attach enforces
    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.validate_at(1)
    }

    fn validate_at(&self, depth: usize) -> Result<(), DescriptorError> {
        if depth > MAX_DEPTH {
            return Err(DescriptorError::TooDeep { max: MAX_DEPTH });
        }
        match self {
            AnimationDescriptor::Timing {
                duration_ms,
                easing,
                ..
            } => {
                if *duration_ms == 0 {
                    return Err(DescriptorError::NonPositiveDuration);
                }
                if !easing.is_valid() {
                    return Err(DescriptorError::InvalidEasing(*easing));
                }
                Ok(())
            }
            AnimationDescriptor::Sequence { steps } => {
                if steps.is_empty() {
                    return Err(DescriptorError::EmptySequence);
                }
                steps.iter().try_for_each(|s| s.validate_at(depth + 1))
            }
            AnimationDescriptor::Repeat { inner, count, .. } => {
                if *count == 0 || *count < INFINITE {
                    return Err(DescriptorError::InvalidRepeatCount(*count));
                }
                inner.validate_at(depth + 1)
            }
            AnimationDescriptor::Delay { inner, .. } => inner.validate_at(depth + 1),
        }
    }

    /// Total run time in milliseconds, `None` if it never completes
    pub fn duration_ms(&self) -> Option<f64> {
        match self {
            AnimationDescriptor::Timing { duration_ms, .. } => Some(*duration_ms as f64),
            AnimationDescriptor::Sequence { steps } => {
                steps.iter().try_fold(0.0, |acc, s| Some(acc + s.duration_ms()?))
            }
            AnimationDescriptor::Repeat { inner, count, .. } => {
                if *count == INFINITE {
                    None
                } else {
                    Some(inner.duration_ms()? * *count as f64)
                }
            }
            AnimationDescriptor::Delay { ms, inner } => Some(*ms as f64 + inner.duration_ms()?),
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + match self {
            AnimationDescriptor::Timing { .. } => 0,
            AnimationDescriptor::Sequence { steps } => steps.iter().map(Self::node_count).sum(),
            AnimationDescriptor::Repeat { inner, .. } | AnimationDescriptor::Delay { inner, .. } => {
                inner.node_count()
            }
        }
    }
}

impl<T: Interpolate> AnimationDescriptor<T> {
    /// Value left behind by a run started at `from`, `None` if it never ends
    pub fn end_value(&self, from: &T) -> Option<T> {
        match self {
            AnimationDescriptor::Timing { target, .. } => Some(target.clone()),
            AnimationDescriptor::Sequence { steps } => steps
                .iter()
                .try_fold(from.clone(), |start, step| step.end_value(&start)),
            AnimationDescriptor::Repeat {
                inner,
                count,
                reverse,
            } => {
                if *count == INFINITE {
                    None
                } else if *reverse && count % 2 == 0 {
                    // Even ping-pong count lands back where it started
                    inner.end_value(from).map(|_| from.clone())
                } else {
                    inner.end_value(from)
                }
            }
            AnimationDescriptor::Delay { inner, .. } => inner.end_value(from),
        }
    }

    /// Value at `t_ms` into a run started at `from`
    ///
    /// Pure counterpart of driving a [`Timeline`](crate::timeline::Timeline)
    /// tick by tick; used to play finite runs backwards.
    pub fn sample(&self, from: &T, t_ms: f64) -> T {
        let t_ms = if t_ms.is_nan() { 0.0 } else { t_ms.max(0.0) };
        match self {
            AnimationDescriptor::Timing {
                target,
                duration_ms,
                easing,
            } => {
                let progress = (t_ms / *duration_ms as f64).min(1.0) as f32;
                mix(from, target, easing.apply(progress))
            }
            AnimationDescriptor::Sequence { steps } => {
                let mut start = from.clone();
                let mut remaining = t_ms;
                for step in steps {
                    let Some(d) = step.duration_ms() else {
                        return step.sample(&start, remaining);
                    };
                    if remaining < d {
                        return step.sample(&start, remaining);
                    }
                    remaining -= d;
                    start = step.sample(&start, d);
                }
                start
            }
            AnimationDescriptor::Repeat {
                inner,
                count,
                reverse,
            } => {
                let Some(d) = inner.duration_ms() else {
                    return inner.sample(from, t_ms);
                };
                let iteration = (t_ms / d).floor();
                if *count != INFINITE && iteration >= *count as f64 {
                    return self.end_value(from).unwrap_or_else(|| from.clone());
                }
                let local = t_ms - iteration * d;
                if *reverse && iteration as u64 % 2 == 1 {
                    inner.sample(from, d - local)
                } else {
                    inner.sample(from, local)
                }
            }
            AnimationDescriptor::Delay { ms, inner } => {
                let ms = *ms as f64;
                if t_ms < ms {
                    from.clone()
                } else {
                    inner.sample(from, t_ms - ms)
                }
            }
        }
    }
}
