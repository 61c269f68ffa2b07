use std::time::Duration;

use tandem_core::clock::{Clock, ManualClock};
use tandem_core::pacer::{
    FramePacer, NOMINAL_FRAME_MS, NOMINAL_SCANLINES, UNBOUNDED_TARGET_FPS, frame_duration_ms,
};

/// Helper: pacer on a manual clock starting at `start_ms`.
fn pacer_at(start_ms: u64) -> (FramePacer, ManualClock) {
    let clock = ManualClock::new(start_ms);
    let pacer = FramePacer::new(Box::new(clock.clone()));
    (pacer, clock)
}

/// Helper: produce one frame and honour the requested delay.
fn frame(pacer: &mut FramePacer, clock: &ManualClock, scanlines: u32) -> Duration {
    let delay = pacer.on_frame_produced(scanlines);
    clock.sleep(delay);
    delay
}

// =============================================================================
// Frame duration
// =============================================================================

#[test]
fn test_nominal_frame_is_one_sixtieth() {
    assert_eq!(frame_duration_ms(NOMINAL_SCANLINES), 1000.0 / 60.0);
    assert_eq!(NOMINAL_FRAME_MS, 1000.0 / 60.0);
}

#[test]
fn test_frame_duration_scales_with_scanlines() {
    let double = frame_duration_ms(NOMINAL_SCANLINES * 2);
    assert!((double - 2.0 * NOMINAL_FRAME_MS).abs() < 1e-9);
    assert_eq!(frame_duration_ms(0), 0.0);
}

#[test]
fn test_ideal_stays_exact_over_many_nominal_frames() {
    let (mut pacer, clock) = pacer_at(0);
    for _ in 0..1000 {
        frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    }
    assert_eq!(pacer.ideal_ms(), NOMINAL_FRAME_MS);
}

// =============================================================================
// Wanted ticks
// =============================================================================

#[test]
fn test_wanted_tick_is_baseline_plus_rounded_multiple() {
    let (mut pacer, clock) = pacer_at(1000);
    for k in 1..=120u64 {
        frame(&mut pacer, &clock, NOMINAL_SCANLINES);
        let expected = 1000 + (k as f64 * NOMINAL_FRAME_MS).round() as u64;
        assert_eq!(pacer.wanted_tick(), expected, "frame {k}");
        assert_eq!(clock.ticks_ms(), expected);
    }
    assert_eq!(pacer.baseline_tick(), 1000);
}

#[test]
fn test_no_drift_over_long_run() {
    let (mut pacer, clock) = pacer_at(0);
    // 100 seconds of nominal frames land on exactly 100000 ms.
    for _ in 0..6000 {
        frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    }
    assert_eq!(clock.ticks_ms(), 100_000);
}

#[test]
fn test_sleep_alternates_between_16_and_17() {
    let (mut pacer, clock) = pacer_at(0);
    let delays: Vec<u128> = (0..6)
        .map(|_| frame(&mut pacer, &clock, NOMINAL_SCANLINES).as_millis())
        .collect();
    assert_eq!(delays, [17, 16, 17, 17, 16, 17]);
}

#[test]
fn test_falling_behind_resets_baseline() {
    let (mut pacer, clock) = pacer_at(0);
    frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    assert_eq!(clock.ticks_ms(), 17);

    // A slow frame: no catch-up burst, pacing restarts from now.
    clock.advance(100);
    let delay = pacer.on_frame_produced(NOMINAL_SCANLINES);
    assert_eq!(delay, Duration::ZERO);
    assert_eq!(pacer.baseline_tick(), 117);
    assert_eq!(pacer.wanted_tick(), 117);
    assert_eq!(pacer.frame_index(), 0);

    let delay = frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    assert_eq!(delay, Duration::from_millis(17));
    assert_eq!(clock.ticks_ms(), 134);
}

#[test]
fn test_exactly_on_time_counts_as_behind() {
    let (mut pacer, clock) = pacer_at(0);
    clock.advance(17);
    assert_eq!(pacer.on_frame_produced(NOMINAL_SCANLINES), Duration::ZERO);
    assert_eq!(pacer.baseline_tick(), 17);
}

#[test]
fn test_wanted_tick_never_decreases_with_variable_frames() {
    let (mut pacer, clock) = pacer_at(0);
    let script = [263, 263, 526, 131, 0, 263, 1, 263, 263, 1000, 263, 0, 0, 263];
    let mut last = pacer.wanted_tick();
    for (i, &scanlines) in script.iter().cycle().take(200).enumerate() {
        if i % 17 == 0 {
            clock.advance(40);
        }
        frame(&mut pacer, &clock, scanlines);
        assert!(
            pacer.wanted_tick() >= last,
            "wanted tick went backwards at frame {i}: {} < {last}",
            pacer.wanted_tick()
        );
        last = pacer.wanted_tick();
    }
}

#[test]
fn test_frame_length_change_continues_from_previous_wanted_tick() {
    let (mut pacer, clock) = pacer_at(0);
    frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    assert_eq!(pacer.wanted_tick(), 17);

    frame(&mut pacer, &clock, NOMINAL_SCANLINES * 2);
    assert_eq!(pacer.baseline_tick(), 17);
    assert_eq!(pacer.wanted_tick(), 17 + 33);
    assert_eq!(pacer.frame_index(), 1);
}

// =============================================================================
// Limiter and reset
// =============================================================================

#[test]
fn test_unlimited_never_sleeps() {
    let (mut pacer, clock) = pacer_at(0);
    pacer.set_limit(false);
    for _ in 0..100 {
        assert_eq!(frame(&mut pacer, &clock, NOMINAL_SCANLINES), Duration::ZERO);
    }
    assert_eq!(clock.ticks_ms(), 0);
}

#[test]
fn test_reset_after_pause_uses_fresh_baseline() {
    let (mut pacer, clock) = pacer_at(0);
    for _ in 0..10 {
        frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    }

    // Five seconds paused, then resumed.
    clock.advance(5000);
    pacer.reset();
    assert_eq!(pacer.baseline_tick(), clock.ticks_ms());
    assert_eq!(pacer.frame_index(), 0);

    let start = clock.ticks_ms();
    let delay = frame(&mut pacer, &clock, NOMINAL_SCANLINES);
    assert_eq!(delay, Duration::from_millis(17));
    assert_eq!(pacer.wanted_tick(), start + 17);
}

// =============================================================================
// FPS measurement
// =============================================================================

#[test]
fn test_fps_sampled_every_30_frames() {
    let (mut pacer, clock) = pacer_at(0);
    let mut samples = Vec::new();
    for _ in 0..60 {
        frame(&mut pacer, &clock, NOMINAL_SCANLINES);
        if let Some(sample) = pacer.record_frame() {
            samples.push((clock.ticks_ms(), sample.to_string()));
        }
    }
    assert_eq!(
        samples,
        [(500, "60/60 FPS".to_string()), (1000, "60/60 FPS".to_string())]
    );
}

#[test]
fn test_fps_reports_slow_machine() {
    let (mut pacer, clock) = pacer_at(0);
    let mut sample = None;
    for _ in 0..30 {
        pacer.on_frame_produced(NOMINAL_SCANLINES);
        clock.advance(33);
        sample = pacer.record_frame().or(sample);
    }
    let sample = sample.expect("sample after 30 frames");
    assert_eq!(sample.measured, 30 * 1000 / 990);
    assert_eq!(sample.target, 60);
}

#[test]
fn test_fps_with_no_elapsed_time_does_not_divide_by_zero() {
    let (mut pacer, _clock) = pacer_at(0);
    pacer.set_limit(false);
    let mut sample = None;
    for _ in 0..30 {
        pacer.on_frame_produced(NOMINAL_SCANLINES);
        sample = pacer.record_frame().or(sample);
    }
    assert_eq!(sample.map(|s| s.measured), Some(30_000));
}

#[test]
fn test_zero_length_frames_target_sentinel() {
    let (mut pacer, clock) = pacer_at(0);
    frame(&mut pacer, &clock, 0);
    assert_eq!(pacer.target_fps(), UNBOUNDED_TARGET_FPS);
}

#[test]
fn test_sub_millisecond_frames_target_sentinel() {
    let (mut pacer, clock) = pacer_at(0);
    // 12 scanlines last about 0.76 ms.
    frame(&mut pacer, &clock, 12);
    assert!(pacer.ideal_ms() > 0.5 && pacer.ideal_ms() < 1.0);
    assert_eq!(pacer.target_fps(), UNBOUNDED_TARGET_FPS);

    // 16 scanlines are just over a millisecond.
    frame(&mut pacer, &clock, 16);
    assert_eq!(pacer.target_fps(), 986);
}

#[test]
fn test_target_follows_frame_length() {
    let (mut pacer, clock) = pacer_at(0);
    assert_eq!(pacer.target_fps(), 60);
    frame(&mut pacer, &clock, NOMINAL_SCANLINES * 2);
    assert_eq!(pacer.target_fps(), 30);
}
