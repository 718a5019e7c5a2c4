//! Compiled animation runs
//!
//! A [`Timeline`] is the mutable half of an animation: it walks a shared,
//! immutable [`AnimationDescriptor`] and keeps per-node run state (elapsed
//! time, sequence position, loop index) in a parallel tree. Time that
//! overflows a finished step is carried into the next one, so motion depends
//! only on total elapsed time and never on how it was split into frames.

use std::sync::Arc;

use crate::descriptor::{AnimationDescriptor, DescriptorError, INFINITE};
use crate::values::{mix, Interpolate};

/// Lifecycle of a timeline
///
/// `Pending -> Running <-> Reversed -> Completed | Cancelled`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimelinePhase {
    /// Attached, waiting for the driver's next tick
    Pending,
    /// Advancing forward
    Running,
    /// Inside a ping-pong iteration that plays backwards
    Reversed,
    /// Ran to completion; the value holds the final result
    Completed,
    /// Stopped by `set`, `cancel`, a replacing attach or teardown
    Cancelled,
}

impl TimelinePhase {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            TimelinePhase::Pending | TimelinePhase::Running | TimelinePhase::Reversed
        )
    }
}

/// Outcome of advancing one run node
#[derive(Clone, Copy, Debug, PartialEq)]
enum Advance {
    Running,
    Finished { overflow_ms: f64 },
}

/// Run state mirroring one descriptor node
#[derive(Clone, Debug)]
enum RunNode<T> {
    Timing {
        from: T,
        elapsed_ms: f64,
    },
    Sequence {
        position: usize,
        step: Box<RunNode<T>>,
    },
    Repeat {
        loop_index: u64,
        origin: T,
        iteration: Box<RunNode<T>>,
    },
    Delay {
        elapsed_ms: f64,
        inner: Option<Box<RunNode<T>>>,
    },
    /// A finite run played backwards from its end to `origin`
    Rewind {
        origin: T,
        elapsed_ms: f64,
        duration_ms: f64,
    },
}

impl<T: Interpolate> RunNode<T> {
    /// Fresh run state for `desc`, starting at `from`
    ///
    /// The descriptor must already be validated (non-empty sequences).
    fn start(desc: &AnimationDescriptor<T>, from: T) -> Self {
        match desc {
            AnimationDescriptor::Timing { .. } => RunNode::Timing {
                from,
                elapsed_ms: 0.0,
            },
            AnimationDescriptor::Sequence { steps } => RunNode::Sequence {
                position: 0,
                step: Box::new(RunNode::start(&steps[0], from)),
            },
            AnimationDescriptor::Repeat { inner, .. } => RunNode::Repeat {
                loop_index: 0,
                origin: from.clone(),
                iteration: Box::new(RunNode::start(inner, from)),
            },
            AnimationDescriptor::Delay { .. } => RunNode::Delay {
                elapsed_ms: 0.0,
                inner: None,
            },
        }
    }

    fn advance(&mut self, desc: &AnimationDescriptor<T>, dt_ms: f64, value: &mut T) -> Advance {
        match (self, desc) {
            (
                RunNode::Rewind {
                    origin,
                    elapsed_ms,
                    duration_ms,
                },
                desc,
            ) => {
                *elapsed_ms += dt_ms;
                if *elapsed_ms >= *duration_ms {
                    *value = origin.clone();
                    Advance::Finished {
                        overflow_ms: *elapsed_ms - *duration_ms,
                    }
                } else {
                    *value = desc.sample(origin, *duration_ms - *elapsed_ms);
                    Advance::Running
                }
            }

            (
                RunNode::Timing { from, elapsed_ms },
                AnimationDescriptor::Timing {
                    target,
                    duration_ms,
                    easing,
                },
            ) => {
                *elapsed_ms += dt_ms;
                let duration = *duration_ms as f64;
                if *elapsed_ms >= duration {
                    *value = target.clone();
                    Advance::Finished {
                        overflow_ms: *elapsed_ms - duration,
                    }
                } else {
                    let progress = (*elapsed_ms / duration) as f32;
                    *value = mix(from, target, easing.apply(progress));
                    Advance::Running
                }
            }

            (RunNode::Sequence { position, step }, AnimationDescriptor::Sequence { steps }) => {
                let mut dt_ms = dt_ms;
                loop {
                    match step.advance(&steps[*position], dt_ms, value) {
                        Advance::Running => return Advance::Running,
                        Advance::Finished { overflow_ms } => {
                            if *position + 1 == steps.len() {
                                return Advance::Finished { overflow_ms };
                            }
                            *position += 1;
                            **step = RunNode::start(&steps[*position], value.clone());
                            dt_ms = overflow_ms;
                        }
                    }
                }
            }

            (
                RunNode::Repeat {
                    loop_index,
                    origin,
                    iteration,
                },
                AnimationDescriptor::Repeat {
                    inner,
                    count,
                    reverse,
                },
            ) => {
                let limit = if *count == INFINITE {
                    u64::MAX
                } else {
                    *count as u64
                };
                let mut dt_ms = dt_ms;
                loop {
                    let Advance::Finished { mut overflow_ms } =
                        iteration.advance(inner, dt_ms, value)
                    else {
                        return Advance::Running;
                    };

                    *loop_index += 1;
                    if *loop_index >= limit {
                        return Advance::Finished { overflow_ms };
                    }

                    // Whole iterations inside one large dt are skipped arithmetically
                    if let Some(period) = inner.duration_ms() {
                        if overflow_ms >= period {
                            let skip = ((overflow_ms / period).floor() as u64)
                                .min(limit - *loop_index);
                            *loop_index += skip;
                            overflow_ms -= skip as f64 * period;
                            let ended_reversed = *reverse && *loop_index % 2 == 0;
                            *value = if ended_reversed {
                                origin.clone()
                            } else {
                                inner.end_value(origin).unwrap_or_else(|| origin.clone())
                            };
                            if *loop_index >= limit {
                                return Advance::Finished { overflow_ms };
                            }
                        }
                    }

                    **iteration = begin_iteration(inner, *loop_index, origin, *reverse);
                    if !matches!(**iteration, RunNode::Rewind { .. }) {
                        *value = origin.clone();
                    }
                    dt_ms = overflow_ms;
                }
            }

            (
                RunNode::Delay { elapsed_ms, inner },
                AnimationDescriptor::Delay {
                    ms,
                    inner: inner_desc,
                },
            ) => {
                let mut dt_ms = dt_ms;
                if inner.is_none() {
                    *elapsed_ms += dt_ms;
                    let hold = *ms as f64;
                    if *elapsed_ms < hold {
                        return Advance::Running;
                    }
                    dt_ms = *elapsed_ms - hold;
                    *inner = Some(Box::new(RunNode::start(inner_desc, value.clone())));
                }
                match inner {
                    Some(node) => node.advance(inner_desc, dt_ms, value),
                    None => Advance::Running,
                }
            }

            _ => {
                tracing::error!("timeline run state diverged from its descriptor");
                Advance::Finished { overflow_ms: dt_ms }
            }
        }
    }

    fn is_rewinding(&self) -> bool {
        match self {
            RunNode::Rewind { .. } => true,
            RunNode::Timing { .. } => false,
            RunNode::Sequence { step, .. } => step.is_rewinding(),
            RunNode::Repeat { iteration, .. } => iteration.is_rewinding(),
            RunNode::Delay { inner, .. } => inner.as_ref().is_some_and(|n| n.is_rewinding()),
        }
    }

    /// Elapsed time of the innermost node currently running
    fn leaf_elapsed_ms(&self) -> f64 {
        match self {
            RunNode::Timing { elapsed_ms, .. } | RunNode::Rewind { elapsed_ms, .. } => *elapsed_ms,
            RunNode::Sequence { step, .. } => step.leaf_elapsed_ms(),
            RunNode::Repeat { iteration, .. } => iteration.leaf_elapsed_ms(),
            RunNode::Delay { elapsed_ms, inner } => {
                inner.as_ref().map_or(*elapsed_ms, |n| n.leaf_elapsed_ms())
            }
        }
    }

    fn loop_index(&self) -> Option<u64> {
        match self {
            RunNode::Repeat { loop_index, .. } => Some(*loop_index),
            RunNode::Sequence { step, .. } => step.loop_index(),
            RunNode::Delay { inner, .. } => inner.as_ref().and_then(|n| n.loop_index()),
            RunNode::Timing { .. } | RunNode::Rewind { .. } => None,
        }
    }

    fn sequence_position(&self) -> Option<usize> {
        match self {
            RunNode::Sequence { position, .. } => Some(*position),
            RunNode::Repeat { iteration, .. } => iteration.sequence_position(),
            RunNode::Delay { inner, .. } => inner.as_ref().and_then(|n| n.sequence_position()),
            RunNode::Timing { .. } | RunNode::Rewind { .. } => None,
        }
    }
}

/// Run state for iteration `index` of a repeat that started at `origin`
///
/// Odd ping-pong iterations rewind the previous one; an inner run that never
/// ends cannot be rewound and simply restarts.
fn begin_iteration<T: Interpolate>(
    inner: &AnimationDescriptor<T>,
    index: u64,
    origin: &T,
    reverse: bool,
) -> RunNode<T> {
    if reverse && index % 2 == 1 {
        if let Some(duration_ms) = inner.duration_ms() {
            return RunNode::Rewind {
                origin: origin.clone(),
                elapsed_ms: 0.0,
                duration_ms,
            };
        }
    }
    RunNode::start(inner, origin.clone())
}

/// A compiled, stateful run of a descriptor
///
/// Timelines are normally owned by the [`FrameDriver`](crate::FrameDriver)
/// and created through [`SharedValue::attach`](crate::SharedValue::attach),
/// but they can be driven by hand:
///
/// ```
/// use glint_animation::{AnimationDescriptor, Timeline, TimelinePhase};
///
/// let mut value = 0.0f32;
/// let mut timeline = Timeline::compile(AnimationDescriptor::linear(100.0, 1000), value).unwrap();
/// timeline.advance(500.0, &mut value);
/// assert_eq!(value, 50.0);
/// assert_eq!(timeline.advance(500.0, &mut value), TimelinePhase::Completed);
/// assert_eq!(value, 100.0);
/// ```
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    descriptor: Arc<AnimationDescriptor<T>>,
    start_value: T,
    root: RunNode<T>,
    elapsed_ms: f64,
    phase: TimelinePhase,
}

impl<T: Interpolate> Timeline<T> {
    /// Validate `descriptor` and build its run state from `start_value`
    pub fn compile(
        descriptor: impl Into<Arc<AnimationDescriptor<T>>>,
        start_value: T,
    ) -> Result<Self, DescriptorError> {
        let descriptor = descriptor.into();
        descriptor.validate()?;
        let root = RunNode::start(&descriptor, start_value.clone());
        Ok(Self {
            descriptor,
            start_value,
            root,
            elapsed_ms: 0.0,
            phase: TimelinePhase::Pending,
        })
    }

    /// Advance by `dt_ms` and write the new value
    ///
    /// Does nothing once completed or cancelled. A delay that is still
    /// holding leaves `value` untouched.
    pub fn advance(&mut self, dt_ms: f64, value: &mut T) -> TimelinePhase {
        if !self.phase.is_active() {
            return self.phase;
        }
        let dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.elapsed_ms += dt_ms;

        self.phase = match self.root.advance(&self.descriptor, dt_ms, value) {
            Advance::Finished { .. } => TimelinePhase::Completed,
            Advance::Running if self.root.is_rewinding() => TimelinePhase::Reversed,
            Advance::Running => TimelinePhase::Running,
        };
        self.phase
    }

    /// Stop without touching the value
    pub fn cancel(&mut self) {
        if self.phase.is_active() {
            self.phase = TimelinePhase::Cancelled;
        }
    }

    pub fn phase(&self) -> TimelinePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        !self.phase.is_active()
    }

    pub fn descriptor(&self) -> &Arc<AnimationDescriptor<T>> {
        &self.descriptor
    }

    /// Value captured when the timeline was compiled
    pub fn start_value(&self) -> &T {
        &self.start_value
    }

    /// Total time advanced since compilation
    pub fn total_elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Elapsed time within the current step or iteration
    pub fn elapsed_ms(&self) -> f64 {
        self.root.leaf_elapsed_ms()
    }

    /// Loop index of the outermost active repeat, if any
    pub fn loop_index(&self) -> Option<u64> {
        self.root.loop_index()
    }

    /// Step index of the outermost active sequence, if any
    pub fn sequence_position(&self) -> Option<usize> {
        self.root.sequence_position()
    }
}
