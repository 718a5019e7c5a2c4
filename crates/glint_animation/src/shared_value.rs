//! Shared values
//!
//! A [`SharedValue`] is the cell render code reads every frame and
//! application code animates. At any instant it has exactly one writer:
//! the frame driver while a timeline is active, application code otherwise.
//! `set`, `cancel` and `attach` hand ownership back by swapping the cell's
//! active timeline id; the driver checks that id under the cell lock before
//! every write, so a stale timeline can never overwrite a newer value.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::descriptor::AnimationDescriptor;
use crate::interpolate::Interpolator;
use crate::scheduler::{
    lock, AttachError, DriverHandle, DrivenTimeline, FrameDriver, TimelineId, TimelineStatus,
};
use crate::timeline::{Timeline, TimelinePhase};
use crate::values::{Animatable, Interpolate};

struct CellState<T> {
    current: T,
    active: Option<TimelineId>,
    /// Phase of the most recently attached timeline
    phase: Option<TimelinePhase>,
}

struct ValueCell<T> {
    state: Mutex<CellState<T>>,
}

impl<T> ValueCell<T> {
    fn lock(&self) -> MutexGuard<'_, CellState<T>> {
        lock(&self.state)
    }

    /// Release the cell from timeline `id` if it still owns it
    fn cancel_if(&self, id: TimelineId) -> bool {
        let mut state = self.lock();
        if state.active == Some(id) {
            state.active = None;
            state.phase = Some(TimelinePhase::Cancelled);
            true
        } else {
            false
        }
    }
}

/// A timeline bound to the cell it animates
///
/// Holds the cell weakly: dropping every `SharedValue` handle orphans the
/// timeline instead of keeping a dead component's value alive.
struct BoundTimeline<T> {
    id: TimelineId,
    timeline: Timeline<T>,
    target: Weak<ValueCell<T>>,
}

impl<T: Animatable> DrivenTimeline for BoundTimeline<T> {
    fn id(&self) -> TimelineId {
        self.id
    }

    fn step(&mut self, dt_ms: f64) -> TimelineStatus {
        let Some(cell) = self.target.upgrade() else {
            self.timeline.cancel();
            return TimelineStatus::Orphaned;
        };

        let mut state = cell.lock();
        if state.active != Some(self.id) {
            self.timeline.cancel();
            return TimelineStatus::Cancelled;
        }

        let phase = self.timeline.advance(dt_ms, &mut state.current);
        state.phase = Some(phase);
        if phase == TimelinePhase::Completed {
            state.active = None;
            TimelineStatus::Completed
        } else {
            TimelineStatus::Running
        }
    }

    fn cancel(&mut self) {
        self.timeline.cancel();
        if let Some(cell) = self.target.upgrade() {
            cell.cancel_if(self.id);
        }
    }
}

/// An animatable value cell
///
/// Cloning gives another handle to the same cell. Reads never wait for a
/// frame; writes from application code always win over a running animation.
///
/// # Example
///
/// ```
/// use glint_animation::{AnimationDescriptor, Easing, FrameDriver};
///
/// let driver = FrameDriver::default();
/// let scale = driver.shared_value(1.0f32);
///
/// scale.attach(AnimationDescriptor::timing(1.2, 300, Easing::EaseOut)).unwrap();
/// driver.tick_ms(300.0);
/// assert_eq!(scale.get(), 1.2);
///
/// // Direct writes cancel whatever is running
/// scale.set(1.0);
/// assert!(!scale.is_animating());
/// ```
pub struct SharedValue<T> {
    cell: Arc<ValueCell<T>>,
    /// `None` binds to the global driver on first attach
    driver: Option<DriverHandle>,
}

impl<T: Animatable> SharedValue<T> {
    /// Create a value animated by the process-wide driver
    pub fn new(initial: T) -> Self {
        Self::from_parts(initial, None)
    }

    pub(crate) fn with_driver(initial: T, driver: DriverHandle) -> Self {
        Self::from_parts(initial, Some(driver))
    }

    fn from_parts(initial: T, driver: Option<DriverHandle>) -> Self {
        Self {
            cell: Arc::new(ValueCell {
                state: Mutex::new(CellState {
                    current: initial,
                    active: None,
                    phase: None,
                }),
            }),
            driver,
        }
    }

    /// Latest committed value
    pub fn get(&self) -> T {
        self.cell.lock().current.clone()
    }

    /// Render-side read, once per frame
    pub fn on_frame(&self) -> T {
        let state = self.cell.lock();
        tracing::trace!(animating = state.active.is_some(), "shared value read for frame");
        state.current.clone()
    }

    /// Write immediately, cancelling any active timeline
    pub fn set(&self, value: T) {
        let mut state = self.cell.lock();
        if let Some(id) = state.active.take() {
            state.phase = Some(TimelinePhase::Cancelled);
            tracing::debug!(%id, "timeline cancelled by set");
        }
        state.current = value;
    }

    /// Animate with `descriptor`, replacing any active timeline
    ///
    /// The current value is the baseline for the run. An invalid descriptor
    /// is rejected up front and leaves the previous timeline untouched.
    pub fn attach(
        &self,
        descriptor: impl Into<Arc<AnimationDescriptor<T>>>,
    ) -> Result<TimelineId, AttachError> {
        let driver = match &self.driver {
            Some(handle) => handle.clone(),
            None => FrameDriver::global().handle(),
        };

        let mut state = self.cell.lock();
        let timeline = Timeline::compile(descriptor, state.current.clone())?;
        let id = TimelineId::next();

        // Queue before claiming the cell: a refused submit must not strand it
        driver.submit(Box::new(BoundTimeline {
            id,
            timeline,
            target: Arc::downgrade(&self.cell),
        }))?;

        if let Some(previous) = state.active.replace(id) {
            tracing::debug!(%previous, %id, "timeline replaced");
        } else {
            tracing::debug!(%id, "timeline attached");
        }
        state.phase = Some(TimelinePhase::Pending);
        Ok(id)
    }

    /// Attach and return a lease that cancels the timeline when dropped
    ///
    /// Tie the lease to the component that started the animation so every
    /// teardown path stops it.
    pub fn attach_scoped(
        &self,
        descriptor: impl Into<Arc<AnimationDescriptor<T>>>,
    ) -> Result<TimelineLease<T>, AttachError> {
        let id = self.attach(descriptor)?;
        Ok(TimelineLease {
            value: self.clone(),
            id,
            detached: false,
        })
    }

    /// Stop the active timeline, keeping the last computed value
    ///
    /// No-op when nothing is running.
    pub fn cancel(&self) {
        let mut state = self.cell.lock();
        if let Some(id) = state.active.take() {
            state.phase = Some(TimelinePhase::Cancelled);
            tracing::debug!(%id, "timeline cancelled");
        }
    }

    /// Whether a timeline currently owns the value
    pub fn is_animating(&self) -> bool {
        self.cell.lock().active.is_some()
    }

    pub fn active_timeline(&self) -> Option<TimelineId> {
        self.cell.lock().active
    }

    /// Phase of the most recently attached timeline (`None` if never animated)
    pub fn phase(&self) -> Option<TimelinePhase> {
        self.cell.lock().phase
    }

    /// Whether two handles point at the same cell
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl SharedValue<f32> {
    /// Map the current value through a range mapping
    pub fn interpolate<U: Interpolate>(&self, map: &Interpolator<U>) -> U {
        map.at(self.get())
    }
}

impl<T> Clone for SharedValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            driver: self.driver.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cell.lock();
        f.debug_struct("SharedValue")
            .field("current", &state.current)
            .field("active", &state.active)
            .field("phase", &state.phase)
            .finish()
    }
}

/// Scoped ownership of one timeline
///
/// Dropping the lease (or calling [`release`](Self::release)) cancels the
/// timeline if it still owns its value. A timeline that was already replaced
/// or completed is left alone.
#[must_use = "dropping a TimelineLease cancels its animation"]
pub struct TimelineLease<T: Animatable> {
    value: SharedValue<T>,
    id: TimelineId,
    detached: bool,
}

impl<T: Animatable> TimelineLease<T> {
    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn value(&self) -> &SharedValue<T> {
        &self.value
    }

    /// Whether the leased timeline still owns its value
    pub fn is_active(&self) -> bool {
        self.value.active_timeline() == Some(self.id)
    }

    /// Cancel now
    pub fn release(self) {}

    /// Let the timeline outlive the lease
    pub fn detach(mut self) -> TimelineId {
        self.detached = true;
        self.id
    }
}

impl<T: Animatable> Drop for TimelineLease<T> {
    fn drop(&mut self) {
        if !self.detached && self.value.cell.cancel_if(self.id) {
            tracing::debug!(id = %self.id, "timeline lease released");
        }
    }
}

impl<T: Animatable> fmt::Debug for TimelineLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineLease")
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use crate::scheduler::DriverConfig;

    fn driver() -> FrameDriver {
        FrameDriver::new(DriverConfig::default())
    }

    #[test]
    fn test_set_cancels_and_wins() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        sv.attach(AnimationDescriptor::linear(100.0, 1000)).unwrap();
        driver.tick_ms(250.0);
        assert_eq!(sv.get(), 25.0);

        sv.set(5.0);
        assert_eq!(sv.get(), 5.0);
        assert_eq!(sv.phase(), Some(TimelinePhase::Cancelled));

        let stats = driver.tick_ms(250.0);
        assert_eq!(stats.retired, 1);
        assert_eq!(sv.get(), 5.0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let driver = driver();
        let sv = driver.shared_value(3.0f32);
        sv.cancel();
        sv.cancel();
        assert_eq!(sv.get(), 3.0);
        assert_eq!(sv.phase(), None);

        sv.attach(AnimationDescriptor::linear(13.0, 100)).unwrap();
        driver.tick_ms(50.0);
        sv.cancel();
        sv.cancel();
        driver.tick_ms(50.0);
        assert_eq!(sv.get(), 8.0);
        assert_eq!(sv.phase(), Some(TimelinePhase::Cancelled));
    }

    #[test]
    fn test_failed_attach_keeps_previous_timeline() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        let id = sv.attach(AnimationDescriptor::linear(10.0, 100)).unwrap();

        let err = sv.attach(AnimationDescriptor::linear(10.0, 0)).unwrap_err();
        assert!(matches!(err, AttachError::Descriptor(_)));
        assert_eq!(sv.active_timeline(), Some(id));

        driver.tick_ms(100.0);
        assert_eq!(sv.get(), 10.0);
    }

    #[test]
    fn test_lease_cancels_on_drop() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        {
            let lease = sv.attach_scoped(AnimationDescriptor::linear(10.0, 100)).unwrap();
            assert!(lease.is_active());
            driver.tick_ms(30.0);
        }
        assert!(!sv.is_animating());
        driver.tick_ms(30.0);
        assert_eq!(sv.get(), 3.0);
    }

    #[test]
    fn test_lease_leaves_newer_timeline_alone() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        let lease = sv.attach_scoped(AnimationDescriptor::linear(10.0, 100)).unwrap();
        let newer = sv.attach(AnimationDescriptor::linear(-10.0, 100)).unwrap();
        assert!(!lease.is_active());
        lease.release();
        assert_eq!(sv.active_timeline(), Some(newer));
    }

    #[test]
    fn test_detached_lease_keeps_running() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        let id = sv
            .attach_scoped(AnimationDescriptor::linear(10.0, 100))
            .unwrap()
            .detach();
        assert_eq!(sv.active_timeline(), Some(id));
        driver.tick_ms(100.0);
        assert_eq!(sv.get(), 10.0);
    }

    #[test]
    fn test_dropped_value_orphans_timeline() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        sv.attach(AnimationDescriptor::linear(10.0, 100).repeat_forever(false))
            .unwrap();
        driver.tick_ms(10.0);
        drop(sv);

        let stats = driver.tick_ms(10.0);
        assert_eq!(stats.retired, 1);
        assert_eq!(driver.active_count(), 0);
    }

    #[test]
    fn test_phase_tracks_lifecycle() {
        let driver = driver();
        let sv = driver.shared_value(0.0f32);
        sv.attach(
            AnimationDescriptor::timing(1.0, 100, Easing::EaseInOut).repeated(2, true),
        )
        .unwrap();
        assert_eq!(sv.phase(), Some(TimelinePhase::Pending));
        driver.tick_ms(50.0);
        assert_eq!(sv.phase(), Some(TimelinePhase::Running));
        driver.tick_ms(100.0);
        assert_eq!(sv.phase(), Some(TimelinePhase::Reversed));
        driver.tick_ms(50.0);
        assert_eq!(sv.phase(), Some(TimelinePhase::Completed));
        assert_eq!(sv.get(), 0.0);
    }

    #[test]
    fn test_color_and_vector_values() {
        use crate::values::{Color, Vec2};

        let driver = driver();
        let tint = driver.shared_value(Color::BLACK);
        let offset = driver.shared_value(Vec2::ZERO);
        tint.attach(AnimationDescriptor::linear(Color::WHITE, 100)).unwrap();
        offset.attach(AnimationDescriptor::linear(Vec2::new(10.0, 20.0), 100)).unwrap();

        driver.tick_ms(50.0);
        assert!(tint.get().approx_eq(&Color::rgb(0.5, 0.5, 0.5), 1e-6));
        assert_eq!(offset.get(), Vec2::new(5.0, 10.0));
    }

    #[test]
    fn test_interpolate_through_map() {
        let driver = driver();
        let progress = driver.shared_value(0.0f32);
        let rotation = Interpolator::new([0.0, 1.0], [0.0f32, 360.0]).unwrap();
        progress.attach(AnimationDescriptor::linear(1.0, 100)).unwrap();
        driver.tick_ms(25.0);
        assert_eq!(progress.interpolate(&rotation), 90.0);
    }

    #[test]
    fn test_clones_share_the_cell() {
        let driver = driver();
        let a = driver.shared_value(1.0f32);
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.set(2.0);
        assert_eq!(a.get(), 2.0);
    }
}
