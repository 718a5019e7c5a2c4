//! End-to-end scenarios: shared values animated through a frame driver

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glint_animation::{
    interpolate, AnimationDescriptor, AnimationPreset, AttachError, Color, DescriptorError,
    DriverConfig, DriverError, Easing, FrameDriver, SharedValue, TimelinePhase,
};

fn driver() -> FrameDriver {
    FrameDriver::new(DriverConfig::default())
}

#[test]
fn test_linear_timing_scenario() {
    let driver = driver();
    let sv = driver.shared_value(0.0f32);
    sv.attach(AnimationDescriptor::linear(100.0, 1000)).unwrap();

    driver.tick_ms(500.0);
    assert_eq!(sv.get(), 50.0);
    assert_eq!(sv.phase(), Some(TimelinePhase::Running));

    driver.tick_ms(500.0);
    assert_eq!(sv.get(), 100.0);
    assert_eq!(sv.phase(), Some(TimelinePhase::Completed));
    assert!(!sv.is_animating());
}

#[test]
fn test_sequence_scenario() {
    let driver = driver();
    let sv = driver.shared_value(0.0f32);
    sv.attach(AnimationDescriptor::sequence([
        AnimationDescriptor::linear(10.0, 100),
        AnimationDescriptor::linear(0.0, 100),
    ]))
    .unwrap();

    driver.tick_ms(100.0);
    assert_eq!(sv.get(), 10.0);
    assert!(sv.is_animating());

    driver.tick_ms(50.0);
    assert_eq!(sv.get(), 5.0);

    driver.tick_ms(50.0);
    assert_eq!(sv.get(), 0.0);
    assert_eq!(sv.phase(), Some(TimelinePhase::Completed));
}

#[test]
fn test_infinite_ping_pong_is_exact() {
    let driver = driver();
    let sv = driver.shared_value(0.25f32);
    sv.attach(AnimationDescriptor::timing(0.9, 300, Easing::EaseInOutCubic).repeat_forever(true))
        .unwrap();

    for cycle in 0..50 {
        // Uneven ticks that still land on the iteration boundaries
        driver.tick_ms(100.0);
        driver.tick_ms(120.0);
        driver.tick_ms(80.0);
        assert_eq!(sv.get(), 0.9, "forward end of cycle {cycle}");

        driver.tick_ms(300.0);
        assert_eq!(sv.get(), 0.25, "reverse end of cycle {cycle}");
    }
    assert!(sv.is_animating());
}

#[test]
fn test_set_mid_animation_stops_driver_writes() {
    let driver = driver();
    let sv = driver.shared_value(0.0f32);
    sv.attach(AnimationDescriptor::linear(100.0, 1000)).unwrap();
    driver.tick_ms(300.0);

    sv.set(5.0);
    for _ in 0..10 {
        driver.tick_ms(100.0);
        assert_eq!(sv.get(), 5.0);
    }
    assert_eq!(driver.active_count(), 0);
}

#[test]
fn test_second_attach_supersedes_first() {
    let driver = driver();
    let sv = driver.shared_value(0.0f32);
    let first = sv.attach(AnimationDescriptor::linear(100.0, 100)).unwrap();
    let second = sv.attach(AnimationDescriptor::linear(-100.0, 100)).unwrap();
    assert_ne!(first, second);
    assert_eq!(sv.active_timeline(), Some(second));

    // Both were queued in the same frame; only the second writes
    let stats = driver.tick_ms(50.0);
    assert_eq!(stats.adopted, 2);
    assert_eq!(stats.retired, 1);
    assert_eq!(sv.get(), -50.0);

    let stats = driver.tick_ms(50.0);
    assert_eq!(stats.completed.as_slice(), &[second]);
    assert_eq!(sv.get(), -100.0);
}

#[test]
fn test_cancel_without_timeline_is_noop() {
    let driver = driver();
    let sv = driver.shared_value(Color::BLACK);
    sv.cancel();
    assert_eq!(sv.get(), Color::BLACK);
    assert_eq!(sv.phase(), None);
    assert_eq!(driver.tick_ms(16.0).retired, 0);
}

#[test]
fn test_invalid_descriptors_are_rejected_at_attach() {
    let driver = driver();
    let sv = driver.shared_value(0.0f32);

    let cases = [
        (
            AnimationDescriptor::sequence(Vec::new()),
            DescriptorError::EmptySequence,
        ),
        (
            AnimationDescriptor::linear(1.0, 0),
            DescriptorError::NonPositiveDuration,
        ),
        (
            AnimationDescriptor::linear(1.0, 10).repeated(0, false),
            DescriptorError::InvalidRepeatCount(0),
        ),
        (
            AnimationDescriptor::linear(1.0, 10).repeated(-2, false),
            DescriptorError::InvalidRepeatCount(-2),
        ),
    ];
    for (desc, expected) in cases {
        assert_eq!(sv.attach(desc), Err(AttachError::Descriptor(expected)));
    }
    assert!(!sv.is_animating());
    assert_eq!(driver.pending_count(), 0);
}

#[test]
fn test_interpolate_drives_colour() {
    let driver = driver();
    let progress = driver.shared_value(0.0f32);
    progress.attach(AnimationDescriptor::linear(1.0, 100)).unwrap();
    driver.tick_ms(50.0);

    let colour = interpolate(
        progress.get(),
        &[0.0, 1.0],
        &[Color::from_hex(0x000000), Color::from_hex(0xffffff)],
    )
    .unwrap();
    assert_eq!(colour.to_rgba8(), [128, 128, 128, 255]);
}

#[test]
fn test_many_values_share_one_dt() {
    let driver = driver();
    let values: Vec<_> = (0..64).map(|i| driver.shared_value(i as f32)).collect();
    for v in &values {
        v.attach(AnimationDescriptor::linear(v.get() + 10.0, 200)).unwrap();
    }

    let stats = driver.tick_ms(100.0);
    assert_eq!(stats.advanced, 64);
    for (i, v) in values.iter().enumerate() {
        assert_eq!(v.get(), i as f32 + 5.0);
    }
}

#[test]
fn test_attach_from_other_threads() {
    let driver = FrameDriver::new(DriverConfig {
        target_fps: 240,
        ..DriverConfig::default()
    });
    driver.start_background();

    let values: Vec<_> = (0..8).map(|_| driver.shared_value(0.0f32)).collect();
    let workers: Vec<_> = values
        .iter()
        .cloned()
        .map(|sv| {
            thread::spawn(move || {
                for _ in 0..20 {
                    sv.attach(AnimationDescriptor::linear(1.0, 5)).unwrap();
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while values.iter().any(SharedValue::is_animating) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    driver.stop_background();

    for v in &values {
        assert!(!v.is_animating());
        assert_eq!(v.get(), 1.0);
    }
}

#[test]
fn test_wake_callback_fires_while_animating() {
    let driver = FrameDriver::new(DriverConfig {
        target_fps: 240,
        ..DriverConfig::default()
    });
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);
    driver.set_wake_callback(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let sv = driver.shared_value(0.0f32);
    sv.attach(AnimationPreset::fade_in(30)).unwrap();
    driver.start_background();

    let deadline = Instant::now() + Duration::from_secs(5);
    while sv.is_animating() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    drop(driver);

    assert_eq!(sv.get(), 1.0);
    assert!(wakes.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_global_driver_is_lazy() {
    let sv = SharedValue::new(0.0f32);
    sv.attach(AnimationDescriptor::linear(2.0, 100)).unwrap();

    let global = FrameDriver::try_global().expect("attach creates the global driver");
    assert!(std::ptr::eq(global, FrameDriver::global()));
    assert_eq!(
        FrameDriver::init_global(DriverConfig::default()).unwrap_err(),
        DriverError::AlreadyInitialized
    );

    global.tick_ms(100.0);
    assert_eq!(sv.get(), 2.0);
}
