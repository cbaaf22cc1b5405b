use pomodoro_focus_rs::{format_countdown, CountdownTimer, TimerSignal};
use tokio::time::{Duration, Instant};

#[test]
fn test_countdown_format() {
    assert_eq!(format_countdown(1500), "00:25:00");
    assert_eq!(format_countdown(3661), "01:01:01");
    assert_eq!(format_countdown(59), "00:00:59");
    assert_eq!(format_countdown(0), "00:00:00");
}

// A full interval of playback completes exactly once
#[test]
fn test_interval_completes_once() {
    let mut timer = CountdownTimer::new(3);
    let now = Instant::now();
    let mut completions = 0;
    let mut pause_requests = 0;

    assert_eq!(timer.evaluate(true, now), TimerSignal::Idle);
    let mut playing = true;
    for _ in 0..3 {
        assert!(timer.pending_tick().is_some());
        timer.tick();
        loop {
            match timer.evaluate(playing, now) {
                TimerSignal::Idle => break,
                TimerSignal::PauseRequested => {
                    pause_requests += 1;
                    playing = false;
                }
                TimerSignal::IntervalComplete => completions += 1,
            }
        }
    }

    assert_eq!(pause_requests, 1);
    assert_eq!(completions, 1);
    assert_eq!(timer.remaining(), 3);
    assert!(timer.pending_tick().is_none());

    // Further evaluations while paused do not count again
    assert_eq!(timer.evaluate(false, now), TimerSignal::Idle);
}

#[test]
fn test_pause_before_zero_does_not_complete() {
    let mut timer = CountdownTimer::new(3);
    let now = Instant::now();

    timer.evaluate(true, now);
    timer.tick();
    assert_eq!(timer.evaluate(true, now), TimerSignal::Idle);
    assert_eq!(timer.remaining(), 2);

    assert_eq!(timer.evaluate(false, now), TimerSignal::Idle);
    assert_eq!(timer.remaining(), 2);
    assert!(timer.pending_tick().is_none());
    assert_eq!(timer.display(), "00:00:02");
}

#[test]
fn test_single_pending_tick() {
    let mut timer = CountdownTimer::new(10);
    let start = Instant::now();

    timer.evaluate(true, start);
    let first = timer.pending_tick().unwrap();
    assert_eq!(first, start + Duration::from_secs(1));

    // Re-evaluating while a decrement is pending keeps the original deadline
    timer.evaluate(true, start + Duration::from_millis(500));
    assert_eq!(timer.pending_tick(), Some(first));
}

#[test]
fn test_zero_interval_clamped() {
    let mut timer = CountdownTimer::new(0);
    let now = Instant::now();
    assert_eq!(timer.interval(), 1);
    assert_eq!(timer.remaining(), 1);

    // Paused at a full interval never signals completion
    for _ in 0..5 {
        assert_eq!(timer.evaluate(false, now), TimerSignal::Idle);
    }

    assert_eq!(timer.evaluate(true, now), TimerSignal::Idle);
    timer.tick();
    assert_eq!(timer.evaluate(true, now), TimerSignal::PauseRequested);
    assert_eq!(timer.evaluate(false, now), TimerSignal::IntervalComplete);
    assert_eq!(timer.evaluate(false, now), TimerSignal::Idle);
}

#[test]
fn test_reset_restores_interval() {
    let mut timer = CountdownTimer::new(5);
    let now = Instant::now();
    timer.evaluate(true, now);
    timer.tick();
    timer.tick();
    assert_eq!(timer.remaining(), 3);

    timer.reset();
    assert_eq!(timer.remaining(), 5);
    assert_eq!(timer.interval(), 5);
    assert!(timer.pending_tick().is_none());
}
