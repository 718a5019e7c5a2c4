//! Frame driver
//!
//! Advances every active timeline once per display refresh. Timelines are
//! implicitly registered when a descriptor is attached to a
//! [`SharedValue`](crate::SharedValue); the driver only ever holds a weak
//! reference to the value it animates.
//!
//! One driver per process is the normal setup ([`FrameDriver::global`]), but
//! drivers are plain values so tests can run isolated instances and tick them
//! with a fixed delta.

use crate::descriptor::DescriptorError;
use crate::shared_value::SharedValue;
use crate::values::Animatable;
use smallvec::SmallVec;
use slotmap::{new_key_type, SlotMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ============================================================================
// Global Frame Driver
// ============================================================================

/// Process-wide driver, created on first use
static GLOBAL_DRIVER: OnceLock<FrameDriver> = OnceLock::new();

/// Source of process-unique timeline ids
static NEXT_TIMELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one attached timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimelineId(u64);

impl TimelineId {
    pub(crate) fn next() -> Self {
        TimelineId(NEXT_TIMELINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timeline#{}", self.0)
    }
}

new_key_type! {
    /// Slot of an adopted timeline inside the driver
    struct TimelineSlot;
}

/// Errors from attaching a descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttachError {
    #[error("invalid animation descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("frame driver has been shut down")]
    DriverShutDown,
}

/// Errors from driver lifecycle calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("global frame driver is already initialized")]
    AlreadyInitialized,
}

/// Lock that survives a panicked holder; every critical section here leaves
/// its state consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of advancing one timeline by one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimelineStatus {
    Running,
    Completed,
    /// Replaced, cancelled or set over since the last tick; nothing written
    Cancelled,
    /// The animated value no longer exists
    Orphaned,
}

/// Type-erased timeline bound to a value cell
pub(crate) trait DrivenTimeline: Send {
    fn id(&self) -> TimelineId;

    /// Advance and commit; must not write once its cell moved on
    fn step(&mut self, dt_ms: f64) -> TimelineStatus;

    /// Detach from the cell without a final write
    fn cancel(&mut self);
}

/// Driver tuning
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Tick rate of the background thread
    pub target_fps: u32,
    /// Optional clamp on a single tick's delta. `None` catches up fully
    /// after a stall, which keeps motion time-based.
    pub max_dt_ms: Option<f64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target_fps: 120,
            max_dt_ms: None,
        }
    }
}

/// What one tick did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frame counter after this tick
    pub frame: u64,
    /// Delta applied to every timeline
    pub dt_ms: f64,
    /// Timelines attached since the previous tick
    pub adopted: usize,
    /// Timelines that advanced and wrote a value
    pub advanced: usize,
    /// Timelines that finished this tick
    pub completed: SmallVec<[TimelineId; 4]>,
    /// Stale timelines dropped without writing
    pub retired: usize,
    /// Timelines still running after this tick
    pub active: usize,
}

impl FrameStats {
    pub fn has_active(&self) -> bool {
        self.active > 0
    }
}

struct Clock {
    last_frame: Option<Instant>,
    frame: u64,
}

/// State shared by the driver, its handles and the background thread
struct DriverInner {
    timelines: Mutex<SlotMap<TimelineSlot, Box<dyn DrivenTimeline>>>,
    /// Attached since the last tick; adopted at the start of the next one
    pending: Mutex<Vec<Box<dyn DrivenTimeline>>>,
    clock: Mutex<Clock>,
    active: AtomicUsize,
    shut_down: AtomicBool,
    config: DriverConfig,
}

impl DriverInner {
    fn tick_ms(&self, dt_ms: f64) -> FrameStats {
        let mut dt_ms = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        if let Some(max) = self.config.max_dt_ms {
            dt_ms = dt_ms.min(max);
        }

        let mut timelines = lock(&self.timelines);
        let adopted = std::mem::take(&mut *lock(&self.pending));

        let mut stats = FrameStats {
            dt_ms,
            adopted: adopted.len(),
            ..FrameStats::default()
        };
        for timeline in adopted {
            timelines.insert(timeline);
        }

        // Same dt for everyone: motion stays frame-consistent
        timelines.retain(|_, timeline| match timeline.step(dt_ms) {
            TimelineStatus::Running => {
                stats.advanced += 1;
                true
            }
            TimelineStatus::Completed => {
                stats.advanced += 1;
                stats.completed.push(timeline.id());
                false
            }
            TimelineStatus::Cancelled | TimelineStatus::Orphaned => {
                stats.retired += 1;
                false
            }
        });

        stats.active = timelines.len();
        self.active.store(stats.active, Ordering::Release);

        let mut clock = lock(&self.clock);
        clock.frame += 1;
        stats.frame = clock.frame;
        drop(clock);

        tracing::trace!(
            frame = stats.frame,
            dt_ms,
            active = stats.active,
            completed = stats.completed.len(),
            retired = stats.retired,
            "frame driver tick"
        );
        stats
    }

    fn wall_clock_dt_ms(&self) -> f64 {
        let now = Instant::now();
        let mut clock = lock(&self.clock);
        let dt = clock
            .last_frame
            .map_or(0.0, |last| (now - last).as_secs_f64() * 1000.0);
        clock.last_frame = Some(now);
        dt
    }

    fn has_active(&self) -> bool {
        self.active.load(Ordering::Acquire) > 0 || !lock(&self.pending).is_empty()
    }

    fn shutdown(&self) {
        let pending = {
            let mut pending = lock(&self.pending);
            if self.shut_down.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *pending)
        };
        let mut cancelled = pending.len();
        for mut timeline in pending {
            timeline.cancel();
        }

        let mut timelines = lock(&self.timelines);
        cancelled += timelines.len();
        for (_, timeline) in timelines.iter_mut() {
            timeline.cancel();
        }
        timelines.clear();
        self.active.store(0, Ordering::Release);

        tracing::debug!(cancelled, "frame driver shut down");
    }
}

/// Callback type for waking up the main thread from the driver thread
///
/// Called when animated values changed and a redraw is due, e.g. to poke an
/// event loop proxy.
pub type WakeCallback = Arc<dyn Fn() + Send + Sync>;

/// The frame driver that ticks all active timelines
///
/// # Background Thread Mode
///
/// The driver can run on its own thread via `start_background()`, so
/// animations keep their cadence regardless of what application logic is
/// doing. Render code reads shared values at its own pace.
///
/// ```
/// use glint_animation::{AnimationDescriptor, DriverConfig, FrameDriver};
///
/// let driver = FrameDriver::new(DriverConfig::default());
/// let opacity = driver.shared_value(0.0f32);
/// opacity.attach(AnimationDescriptor::linear(1.0, 200)).unwrap();
///
/// driver.tick_ms(100.0);
/// assert_eq!(opacity.get(), 0.5);
/// ```
pub struct FrameDriver {
    inner: Arc<DriverInner>,
    /// Stop signal for background thread
    stop_flag: Arc<AtomicBool>,
    /// Set by the background thread when values changed; cleared by the
    /// render side via `take_needs_redraw()`
    needs_redraw: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    wake_callback: Mutex<Option<WakeCallback>>,
}

impl FrameDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            inner: Arc::new(DriverInner {
                timelines: Mutex::new(SlotMap::with_key()),
                pending: Mutex::new(Vec::new()),
                clock: Mutex::new(Clock {
                    last_frame: None,
                    frame: 0,
                }),
                active: AtomicUsize::new(0),
                shut_down: AtomicBool::new(false),
                config,
            }),
            stop_flag: Arc::new(AtomicBool::new(false)),
            needs_redraw: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
            wake_callback: Mutex::new(None),
        }
    }

    /// The process-wide driver, created with default config on first use
    pub fn global() -> &'static FrameDriver {
        GLOBAL_DRIVER.get_or_init(|| {
            tracing::debug!("initializing global frame driver");
            FrameDriver::new(DriverConfig::default())
        })
    }

    /// Create the process-wide driver with an explicit config
    ///
    /// Call once at app startup, before any value is animated.
    pub fn init_global(config: DriverConfig) -> Result<&'static FrameDriver, DriverError> {
        let mut created = false;
        let driver = GLOBAL_DRIVER.get_or_init(|| {
            created = true;
            FrameDriver::new(config)
        });
        if created {
            Ok(driver)
        } else {
            Err(DriverError::AlreadyInitialized)
        }
    }

    /// The process-wide driver, if something already created it
    pub fn try_global() -> Option<&'static FrameDriver> {
        GLOBAL_DRIVER.get()
    }

    /// Create a value animated by this driver
    pub fn shared_value<T: Animatable>(&self, initial: T) -> SharedValue<T> {
        SharedValue::with_driver(initial, self.handle())
    }

    /// Get a weak handle to this driver for passing to components
    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.inner.config
    }

    /// Tick with the wall-clock time since the previous tick
    ///
    /// An attach that wakes an idle driver restarts the clock, so the next
    /// tick measures from that attach rather than from the last busy frame.
    /// A driver that has neither ticked nor been attached to applies a zero
    /// delta.
    pub fn tick(&self) -> FrameStats {
        let dt_ms = self.inner.wall_clock_dt_ms();
        self.inner.tick_ms(dt_ms)
    }

    /// Tick with an explicit delta in milliseconds
    pub fn tick_ms(&self, dt_ms: f64) -> FrameStats {
        self.inner.tick_ms(dt_ms)
    }

    pub fn tick_duration(&self, dt: Duration) -> FrameStats {
        self.inner.tick_ms(dt.as_secs_f64() * 1000.0)
    }

    /// Whether any timeline is running or waiting for its first tick
    pub fn has_active_animations(&self) -> bool {
        self.inner.has_active()
    }

    /// Number of adopted timelines after the last tick
    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Number of timelines waiting for the next tick
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Number of ticks run so far
    pub fn frame(&self) -> u64 {
        lock(&self.inner.clock).frame
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Cancel every timeline and refuse new ones
    ///
    /// Values keep whatever they last showed. Stops the background thread.
    pub fn shutdown(&self) {
        self.stop_background();
        self.inner.shutdown();
    }

    /// Set a wake callback invoked from the background thread when a
    /// redraw is due
    ///
    /// The thread captures the callback when it starts. Set it before
    /// `start_background()`; a later call only takes effect after the thread
    /// is stopped and started again.
    pub fn set_wake_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *lock(&self.wake_callback) = Some(Arc::new(callback));
    }

    /// Start ticking on a background thread at `target_fps`
    ///
    /// The thread sets the `needs_redraw` flag whenever something animated
    /// and calls the wake callback, if any. Starting twice is a no-op.
    pub fn start_background(&self) {
        let mut handle = lock(&self.thread_handle);
        if handle.is_some() || self.is_shut_down() {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let stop_flag = Arc::clone(&self.stop_flag);
        let needs_redraw = Arc::clone(&self.needs_redraw);
        let wake_callback = lock(&self.wake_callback).clone();
        let fps = inner.config.target_fps.max(1);

        tracing::debug!(fps, "starting frame driver thread");

        *handle = Some(thread::spawn(move || {
            let frame_duration = Duration::from_micros(1_000_000 / fps as u64);
            let mut woken: u64 = 0;

            while !stop_flag.load(Ordering::Relaxed) {
                let start = Instant::now();

                let dt_ms = inner.wall_clock_dt_ms();
                let stats = inner.tick_ms(dt_ms);

                if stats.advanced > 0 {
                    needs_redraw.store(true, Ordering::Release);
                    if let Some(ref callback) = wake_callback {
                        // Log roughly once per second
                        if woken % fps as u64 == 0 {
                            tracing::debug!(active = stats.active, "driver thread: waking render loop");
                        }
                        woken += 1;
                        callback();
                    }
                }

                let elapsed = start.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
            }
        }));
    }

    /// Stop the background thread and wait for it to exit
    pub fn stop_background(&self) {
        let handle = lock(&self.thread_handle).take();
        if let Some(handle) = handle {
            self.stop_flag.store(true, Ordering::Relaxed);
            if handle.join().is_err() {
                tracing::warn!("frame driver thread panicked");
            }
            self.stop_flag.store(false, Ordering::Relaxed);
            tracing::debug!("frame driver thread stopped");
        }
    }

    pub fn is_background_running(&self) -> bool {
        lock(&self.thread_handle).is_some()
    }

    /// Check and clear the needs_redraw flag
    pub fn take_needs_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::Acquire)
    }

    /// Manually request a redraw
    pub fn request_redraw(&self) {
        self.needs_redraw.store(true, Ordering::Release);
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

impl fmt::Debug for FrameDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDriver")
            .field("active", &self.active_count())
            .field("pending", &self.pending_count())
            .field("frame", &self.frame())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        // Values outlive their driver; leave none of them marked as animating
        self.shutdown();
    }
}

/// Cancel every timeline on the global driver, if it exists
///
/// Call on application shutdown.
pub fn shutdown_global() {
    if let Some(driver) = FrameDriver::try_global() {
        driver.shutdown();
    }
}

/// A weak handle to a frame driver
///
/// Held by shared values; it won't keep the driver alive.
#[derive(Clone)]
pub struct DriverHandle {
    inner: Weak<DriverInner>,
}

impl DriverHandle {
    /// Queue a timeline for the next tick
    ///
    /// Never waits on a running tick: only the pending queue is locked.
    pub(crate) fn submit(&self, timeline: Box<dyn DrivenTimeline>) -> Result<(), AttachError> {
        let inner = self.inner.upgrade().ok_or(AttachError::DriverShutDown)?;
        let mut pending = lock(&inner.pending);
        if inner.shut_down.load(Ordering::Acquire) {
            return Err(AttachError::DriverShutDown);
        }
        if pending.is_empty() && inner.active.load(Ordering::Acquire) == 0 {
            // Idle driver: don't bill the idle time to the new timeline
            lock(&inner.clock).last_frame = Some(Instant::now());
        }
        pending.push(timeline);
        Ok(())
    }

    /// Check if the driver is still alive and accepting timelines
    pub fn is_alive(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| !inner.shut_down.load(Ordering::Acquire))
    }
}

impl fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
