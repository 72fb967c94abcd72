//! Unit tests for the sequencer
//!
//! Tests cover:
//! - Ordering in auto mode
//! - Pausing in step-by-step mode
//! - Mode switches while paused
//! - Idempotent start, reset, stop
//! - Wait callback isolation
//! - Speed factor scaling

use patternflow::scheduler::VirtualScheduler;
use patternflow::sequencer::{PlaybackMode, RunState, Sequencer, DEFAULT_BASE_DELAY};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

type Log = Rc<RefCell<Vec<usize>>>;

fn spy_steps(seq: &Sequencer, n: usize) -> Log {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    for i in 0..n {
        let log = Rc::clone(&log);
        seq.add_step(move || log.borrow_mut().push(i));
    }
    log
}

fn setup() -> (Rc<VirtualScheduler>, Sequencer) {
    let sched = VirtualScheduler::new();
    let seq = Sequencer::new(sched.clone());
    (sched, seq)
}

// ============================================================================
// Auto mode
// ============================================================================

mod auto_mode_tests {
    use super::*;

    #[test]
    fn test_runs_every_step_once_in_order() {
        let (sched, seq) = setup();
        let log = spy_steps(&seq, 6);

        seq.start();
        sched.run_until_idle(100);

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(seq.state(), RunState::Completed);
    }

    #[test]
    fn test_steps_spaced_by_base_delay() {
        let (sched, seq) = setup();
        let log = spy_steps(&seq, 3);

        seq.start();
        assert_eq!(*log.borrow(), vec![0]);

        sched.advance(DEFAULT_BASE_DELAY - Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec![0]);

        sched.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec![0, 1]);

        sched.advance(DEFAULT_BASE_DELAY);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_never_waits_in_auto_mode() {
        let (sched, seq) = setup();
        let _log = spy_steps(&seq, 3);
        seq.start();
        assert!(!seq.is_waiting());
        sched.advance(DEFAULT_BASE_DELAY);
        assert!(!seq.is_waiting());
    }
}

// ============================================================================
// Step-by-step mode
// ============================================================================

mod step_mode_tests {
    use super::*;

    #[test]
    fn test_pauses_after_each_step() {
        let (sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 3);

        seq.start();
        assert_eq!(*log.borrow(), vec![0]);
        assert!(seq.is_waiting());

        // Time alone never moves a paused sequencer.
        sched.advance(Duration::from_secs(3600));
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(sched.pending_count(), 0);

        seq.advance_to_next_step();
        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(seq.is_waiting());
    }

    #[test]
    fn test_abc_walkthrough() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 3);

        seq.start();
        assert_eq!(*log.borrow(), vec![0]);
        assert!(seq.is_waiting());

        seq.advance_to_next_step();
        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(seq.is_waiting());

        seq.advance_to_next_step();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(!seq.is_waiting());
        assert_eq!(seq.state(), RunState::Completed);

        seq.advance_to_next_step();
        seq.advance_to_next_step();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_advance_when_not_waiting_is_noop() {
        let (_sched, seq) = setup();
        let log = spy_steps(&seq, 2);
        seq.advance_to_next_step();
        assert!(log.borrow().is_empty());
        assert_eq!(seq.state(), RunState::Idle);
    }

    #[test]
    fn test_wait_listener_sees_toggles() {
        let sched = VirtualScheduler::new();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&changes);
        let seq = Sequencer::new(sched).with_wait_listener(move |w| c.borrow_mut().push(w));
        seq.set_mode(PlaybackMode::StepByStep);
        let _log = spy_steps(&seq, 3);

        seq.start();
        seq.advance_to_next_step();
        seq.advance_to_next_step();

        assert_eq!(*changes.borrow(), vec![true, false, true, false]);
    }
}

// ============================================================================
// Mode switching
// ============================================================================

mod mode_switch_tests {
    use super::*;

    #[test]
    fn test_switch_to_auto_while_waiting_resumes() {
        let (sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 4);

        seq.start();
        assert!(seq.is_waiting());

        seq.set_mode(PlaybackMode::Auto);
        assert!(!seq.is_waiting());
        assert_eq!(*log.borrow(), vec![0, 1]);

        sched.run_until_idle(100);
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
        assert_eq!(seq.state(), RunState::Completed);
    }

    #[test]
    fn test_switch_to_step_mode_mid_run_pauses_after_next_step() {
        let (sched, seq) = setup();
        let log = spy_steps(&seq, 4);

        seq.start();
        seq.set_mode(PlaybackMode::StepByStep);
        sched.run_until_idle(100);

        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(seq.is_waiting());
    }

    #[test]
    fn test_switch_to_auto_runs_queued_callbacks() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let _log = spy_steps(&seq, 3);
        seq.start();

        let called = Rc::new(Cell::new(false));
        let c = Rc::clone(&called);
        seq.wait_for_next_step(move || {
            c.set(true);
            Ok(())
        });
        seq.set_mode(PlaybackMode::Auto);

        assert!(called.get());
    }
}

// ============================================================================
// start / stop / reset
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_start_twice_is_idempotent() {
        let (sched, seq) = setup();
        let log = spy_steps(&seq, 3);

        seq.start();
        seq.start();
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(seq.current_index(), 1);
        assert_eq!(sched.pending_count(), 1);

        sched.run_until_idle(100);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_start_while_waiting_is_noop() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 3);
        seq.start();
        seq.start();
        assert_eq!(*log.borrow(), vec![0]);
        assert!(seq.is_waiting());
    }

    #[test]
    fn test_reset_clears_everything() {
        let (sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let old = spy_steps(&seq, 3);
        seq.start();
        assert!(seq.is_waiting());

        seq.reset();
        assert!(!seq.is_waiting());
        assert!(seq.is_empty());
        assert_eq!(seq.current_index(), 0);
        assert_eq!(seq.state(), RunState::Idle);

        seq.set_mode(PlaybackMode::Auto);
        let fresh = spy_steps(&seq, 2);
        seq.start();
        sched.run_until_idle(100);

        assert_eq!(*old.borrow(), vec![0]);
        assert_eq!(*fresh.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_reset_after_completion_allows_rerun() {
        let (sched, seq) = setup();
        let first = spy_steps(&seq, 2);
        seq.start();
        sched.run_until_idle(100);
        assert_eq!(seq.state(), RunState::Completed);

        seq.reset();
        let second = spy_steps(&seq, 2);
        seq.start();
        sched.run_until_idle(100);

        assert_eq!(*first.borrow(), vec![0, 1]);
        assert_eq!(*second.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_completed_run_ignores_start_until_reset() {
        let (sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 2);
        seq.start();
        seq.advance_to_next_step();
        assert_eq!(seq.state(), RunState::Completed);

        let l = Rc::clone(&log);
        seq.add_step(move || l.borrow_mut().push(99));
        seq.start();
        seq.advance_to_next_step();
        sched.run_until_idle(100);

        assert_eq!(*log.borrow(), vec![0, 1]);
        assert!(!seq.is_waiting());
        assert_eq!(seq.state(), RunState::Completed);

        seq.reset();
        let fresh = spy_steps(&seq, 1);
        seq.start();
        assert_eq!(*fresh.borrow(), vec![0]);
    }

    #[test]
    fn test_reset_mid_auto_run_prevents_late_steps() {
        let (sched, seq) = setup();
        let log = spy_steps(&seq, 5);

        seq.start();
        sched.advance(DEFAULT_BASE_DELAY);
        seq.reset();
        sched.advance(Duration::from_secs(60));

        assert_eq!(*log.borrow(), vec![0, 1]);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn test_stop_while_waiting_notifies() {
        let sched = VirtualScheduler::new();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&changes);
        let seq = Sequencer::new(sched).with_wait_listener(move |w| c.borrow_mut().push(w));
        seq.set_mode(PlaybackMode::StepByStep);
        let _log = spy_steps(&seq, 3);

        seq.start();
        seq.stop();

        assert!(!seq.is_waiting());
        assert_eq!(seq.len(), 3);
        assert_eq!(*changes.borrow(), vec![true, false]);
    }
}

// ============================================================================
// Wait callbacks
// ============================================================================

mod wait_callback_tests {
    use super::*;

    #[test]
    fn test_callbacks_run_once_in_order_even_if_first_fails() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 3);
        seq.start();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let c = Rc::clone(&calls);
        seq.wait_for_next_step(move || {
            c.borrow_mut().push("first");
            anyhow::bail!("first callback failed")
        });
        let c = Rc::clone(&calls);
        seq.wait_for_next_step(move || {
            c.borrow_mut().push("second");
            Ok(())
        });

        seq.advance_to_next_step();
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
        assert_eq!(*log.borrow(), vec![0, 1]);

        seq.advance_to_next_step();
        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let log = spy_steps(&seq, 2);
        seq.start();

        let second = Rc::new(Cell::new(false));
        let s = Rc::clone(&second);
        seq.wait_for_next_step(|| panic!("callback exploded"));
        seq.wait_for_next_step(move || {
            s.set(true);
            Ok(())
        });

        seq.advance_to_next_step();
        assert!(second.get());
        assert_eq!(*log.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_callbacks_registered_before_start_run_on_first_advance() {
        let (_sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        let _log = spy_steps(&seq, 2);

        let called = Rc::new(Cell::new(0));
        let c = Rc::clone(&called);
        seq.wait_for_next_step(move || {
            c.set(c.get() + 1);
            Ok(())
        });
        seq.start();
        assert_eq!(called.get(), 0);

        seq.advance_to_next_step();
        assert_eq!(called.get(), 1);
    }
}

// ============================================================================
// Speed factor
// ============================================================================

mod speed_tests {
    use super::*;

    fn first_delay(speed: f64) -> Duration {
        let (sched, seq) = setup();
        let seq = seq.with_base_delay(Duration::from_millis(800));
        seq.set_speed_factor(speed);
        let _log = spy_steps(&seq, 2);
        seq.start();
        sched.next_delay().unwrap()
    }

    #[test]
    fn test_double_speed_halves_delay() {
        assert_eq!(first_delay(1.0), Duration::from_millis(800));
        assert_eq!(first_delay(2.0), Duration::from_millis(400));
        assert_eq!(first_delay(2.0) * 2, first_delay(1.0));
    }

    #[test]
    fn test_half_speed_doubles_delay() {
        assert_eq!(first_delay(0.5), Duration::from_millis(1600));
    }

    #[test]
    fn test_speed_change_applies_to_next_step() {
        let (sched, seq) = setup();
        let _log = spy_steps(&seq, 3);
        seq.start();
        seq.set_speed_factor(4.0);
        sched.advance(DEFAULT_BASE_DELAY);

        let delays = sched.scheduled_delays();
        assert_eq!(delays, vec![DEFAULT_BASE_DELAY, DEFAULT_BASE_DELAY / 4]);
    }

    #[test]
    fn test_speed_does_not_affect_step_mode() {
        let (sched, seq) = setup();
        seq.set_mode(PlaybackMode::StepByStep);
        seq.set_speed_factor(10.0);
        let log = spy_steps(&seq, 2);
        seq.start();
        sched.advance(Duration::from_secs(10));
        assert_eq!(*log.borrow(), vec![0]);
    }
}
