//! Tearing down the process-wide driver
//!
//! Lives in its own test binary: shutting the global driver down is permanent
//! for the process.

use glint_animation::{
    shutdown_global, AnimationDescriptor, AttachError, FrameDriver, SharedValue, TimelinePhase,
};

#[test]
fn test_shutdown_global_cancels_and_refuses_new_timelines() {
    // Nothing to tear down yet, and no driver gets created
    shutdown_global();
    assert!(FrameDriver::try_global().is_none());

    let running = SharedValue::new(0.0f32);
    let queued = SharedValue::new(0.0f32);
    running
        .attach(AnimationDescriptor::linear(1.0, 100).repeat_forever(true))
        .unwrap();
    let global = FrameDriver::try_global().expect("attach creates the global driver");
    global.tick_ms(25.0);
    queued.attach(AnimationDescriptor::linear(1.0, 100)).unwrap();

    shutdown_global();
    assert!(global.is_shut_down());
    assert_eq!(global.active_count(), 0);
    assert_eq!(global.pending_count(), 0);
    assert_eq!(running.phase(), Some(TimelinePhase::Cancelled));
    assert_eq!(queued.phase(), Some(TimelinePhase::Cancelled));
    assert!(!running.is_animating());
    assert_eq!(running.get(), 0.25);
    assert_eq!(queued.get(), 0.0);

    assert_eq!(
        running.attach(AnimationDescriptor::linear(1.0, 100)),
        Err(AttachError::DriverShutDown)
    );
    assert_eq!(
        SharedValue::new(0.0f32).attach(AnimationDescriptor::linear(1.0, 100)),
        Err(AttachError::DriverShutDown)
    );

    // Values still accept direct writes
    running.set(0.5);
    assert_eq!(running.get(), 0.5);
}
