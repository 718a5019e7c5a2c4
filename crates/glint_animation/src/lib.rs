//! Glint Animation Engine
//!
//! Declarative animations for shared values, driven from a frame thread.
//!
//! # Features
//!
//! - **Shared Values**: Cells read by render code and animated by the driver
//! - **Descriptors**: Timing curves composed with sequence, repeat and delay
//! - **Interpolation**: Map a value through numeric or colour ranges
//! - **Frame Driver**: Advances every timeline once per frame, on any thread
//!
//! # Example
//!
//! ```
//! use glint_animation::{AnimationDescriptor, Easing, FrameDriver, TimelinePhase};
//!
//! let driver = FrameDriver::default();
//! let value = driver.shared_value(0.0f32);
//!
//! value
//!     .attach(
//!         AnimationDescriptor::timing(10.0, 100, Easing::EaseOut)
//!             .then(AnimationDescriptor::linear(0.0, 100)),
//!     )
//!     .unwrap();
//!
//! driver.tick_ms(100.0);
//! assert_eq!(value.get(), 10.0);
//! driver.tick_ms(100.0);
//! assert_eq!(value.get(), 0.0);
//! assert_eq!(value.phase(), Some(TimelinePhase::Completed));
//! ```

pub mod descriptor;
pub mod easing;
pub mod interpolate;
pub mod presets;
pub mod scheduler;
pub mod shared_value;
pub mod timeline;
pub mod values;

pub use descriptor::{AnimationDescriptor, DescriptorError, INFINITE, MAX_DEPTH};
pub use easing::{Easing, UnknownEasing};
pub use interpolate::{interpolate, Interpolator, RangeMismatchError};
pub use presets::{AnimationPreset, PresetSpec, UnknownPreset};
pub use scheduler::{
    shutdown_global, AttachError, DriverConfig, DriverError, DriverHandle, FrameDriver,
    FrameStats, TimelineId, WakeCallback,
};
pub use shared_value::{SharedValue, TimelineLease};
pub use timeline::{Timeline, TimelinePhase};
pub use values::{mix, Animatable, Color, Interpolate, Vec2};
