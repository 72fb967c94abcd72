//! Stepped Animation Sequencer
//!
//! Drives an ordered list of caller-supplied steps to completion, either
//! unattended on a timer ([`PlaybackMode::Auto`]) or one step at a time
//! ([`PlaybackMode::StepByStep`]), where it pauses after every step until
//! [`Sequencer::advance_to_next_step`] is called.
//!
//! ```text
//!            start()                 auto: timer(base/speed)
//!   Idle ─────────────▶ Running ──────────────────────┐
//!                        │   ▲ ◀──────────────────────┘
//!          step-by-step  │   │ advance_to_next_step()
//!                        ▼   │ set_mode(Auto)
//!                      Waiting
//!
//!   Running ── last step executed ──▶ Completed
//!   any ── stop() ──▶ Idle (steps kept)     any ── reset() ──▶ Idle (cleared)
//! ```
//!
//! The sequencer is single-threaded. Timers go through the injected
//! [`Scheduler`], so tests can drive it with a virtual clock.

use crate::scheduler::{Scheduler, TimerHandle};
use crate::telemetry;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::debug;

/// Smallest accepted speed factor.
pub const MIN_SPEED_FACTOR: f64 = 0.1;

/// Delay between auto-mode steps at speed factor 1.0.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// How the sequencer moves from one step to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackMode {
    /// Advance on a timer
    #[default]
    Auto,
    /// Pause after every step until advanced
    #[value(name = "step", alias = "step-by-step")]
    #[serde(alias = "step")]
    StepByStep,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Auto => write!(f, "auto"),
            PlaybackMode::StepByStep => write!(f, "step-by-step"),
        }
    }
}

/// Observable run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Waiting,
    Completed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Waiting => "waiting",
            RunState::Completed => "completed",
        }
    }
}

type Step = Rc<dyn Fn()>;
type WaitCallback = Box<dyn FnOnce() -> anyhow::Result<()>>;
type WaitListener = Rc<dyn Fn(bool)>;

struct Inner {
    steps: Vec<Step>,
    index: usize,
    mode: PlaybackMode,
    speed_factor: f64,
    base_delay: Duration,
    running: bool,
    waiting: bool,
    completed: bool,
    pending_timer: Option<TimerHandle>,
    wait_callbacks: Vec<WaitCallback>,
    /// Bumped by stop/reset so stale timers and in-flight steps are ignored.
    epoch: u64,
    on_wait_change: Option<WaitListener>,
}

impl Inner {
    fn state(&self) -> RunState {
        if self.waiting {
            RunState::Waiting
        } else if self.running {
            RunState::Running
        } else if self.completed {
            RunState::Completed
        } else {
            RunState::Idle
        }
    }

    fn step_delay(&self) -> Duration {
        let nanos = self.base_delay.as_nanos() as f64 / self.speed_factor;
        Duration::from_nanos(nanos.round() as u64)
    }
}

/// Plays an ordered list of steps.
///
/// Cloning yields another handle to the same sequencer, which is how steps
/// and listeners reach back into it.
#[derive(Clone)]
pub struct Sequencer {
    inner: Rc<RefCell<Inner>>,
    scheduler: Rc<dyn Scheduler>,
}

impl Sequencer {
    /// Create an idle sequencer in auto mode at speed 1.0.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                steps: Vec::new(),
                index: 0,
                mode: PlaybackMode::Auto,
                speed_factor: 1.0,
                base_delay: DEFAULT_BASE_DELAY,
                running: false,
                waiting: false,
                completed: false,
                pending_timer: None,
                wait_callbacks: Vec::new(),
                epoch: 0,
                on_wait_change: None,
            })),
            scheduler,
        }
    }

    /// Register the listener told whenever the waiting state toggles.
    pub fn with_wait_listener(self, listener: impl Fn(bool) + 'static) -> Self {
        self.inner.borrow_mut().on_wait_change = Some(Rc::new(listener));
        self
    }

    /// Set the delay between auto-mode steps at speed 1.0.
    pub fn with_base_delay(self, delay: Duration) -> Self {
        self.inner.borrow_mut().base_delay = delay;
        self
    }

    /// Append a step and return its index.
    ///
    /// Steps added during a run are played if the run has not passed their
    /// index yet. A panicking step is not caught here: it unwinds into
    /// whichever call executed it (`start`, `advance_to_next_step`, or the
    /// scheduler's timer task).
    pub fn add_step(&self, action: impl Fn() + 'static) -> usize {
        let mut inner = self.inner.borrow_mut();
        inner.steps.push(Rc::new(action));
        inner.steps.len() - 1
    }

    pub fn set_mode(&self, mode: PlaybackMode) {
        let resume = {
            let mut inner = self.inner.borrow_mut();
            if inner.mode != mode {
                debug!(from = %inner.mode, to = %mode, "Playback mode changed");
            }
            inner.mode = mode;
            mode == PlaybackMode::Auto && inner.waiting
        };

        if resume {
            self.advance_to_next_step();
        }
    }

    /// Set the auto-mode speed multiplier. Applies from the next scheduled step.
    pub fn set_speed_factor(&self, factor: f64) {
        let clamped = if factor.is_finite() {
            factor.max(MIN_SPEED_FACTOR)
        } else {
            MIN_SPEED_FACTOR
        };
        self.inner.borrow_mut().speed_factor = clamped;
    }

    /// Begin playback from the current index.
    ///
    /// After [`stop`](Self::stop) this resumes where the run halted rather
    /// than at step 0; call [`reset`](Self::reset) to start over. No-op while
    /// a run is active, and no-op once a run has completed until `reset`.
    pub fn start(&self) {
        let from = {
            let mut inner = self.inner.borrow_mut();
            if inner.running {
                debug!("start() ignored: sequencer already running");
                return;
            }
            if inner.completed {
                debug!("start() ignored: run completed, reset() required");
                return;
            }
            let from = inner.state().as_str();
            inner.running = true;
            from
        };
        telemetry::record_state_transition(from, "running");
        self.execute_next_step();
    }

    /// Halt playback, keeping the recorded steps.
    pub fn stop(&self) {
        let (from, was_waiting) = {
            let mut inner = self.inner.borrow_mut();
            let from = inner.state().as_str();
            self.cancel_timer(&mut inner);
            inner.epoch += 1;
            inner.running = false;
            (from, std::mem::replace(&mut inner.waiting, false))
        };
        let to = self.inner.borrow().state().as_str();
        telemetry::record_state_transition(from, to);
        if was_waiting {
            self.notify_wait_change(false);
        }
    }

    /// Cancel playback and clear all steps and queued wait callbacks.
    pub fn reset(&self) {
        let (from, was_waiting, discarded) = {
            let mut inner = self.inner.borrow_mut();
            let from = inner.state().as_str();
            self.cancel_timer(&mut inner);
            inner.epoch += 1;
            inner.steps.clear();
            inner.index = 0;
            inner.running = false;
            inner.completed = false;
            let discarded = std::mem::take(&mut inner.wait_callbacks);
            (from, std::mem::replace(&mut inner.waiting, false), discarded)
        };
        // Dropped outside the borrow: a callback's captures may hold a handle to us.
        drop(discarded);
        telemetry::record_state_transition(from, "idle");
        if was_waiting {
            self.notify_wait_change(false);
        }
    }

    /// Leave the waiting state and continue. No-op unless waiting.
    ///
    /// Queued wait callbacks run first, in registration order. A callback
    /// that errors or panics is logged and skipped.
    pub fn advance_to_next_step(&self) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if !inner.waiting {
                return;
            }
            inner.waiting = false;
            std::mem::take(&mut inner.wait_callbacks)
        };

        telemetry::record_state_transition("waiting", "running");
        self.notify_wait_change(false);

        for (position, callback) in callbacks.into_iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(callback)) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => telemetry::record_callback_failure(position, &format!("{:#}", e)),
                Err(payload) => {
                    telemetry::record_callback_failure(position, &panic_message(payload.as_ref()))
                }
            }
        }

        if self.inner.borrow().running {
            self.execute_next_step();
        }
    }

    /// Queue a callback for the next successful advance.
    pub fn wait_for_next_step(&self, callback: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.inner.borrow_mut().wait_callbacks.push(Box::new(callback));
    }

    pub fn is_waiting(&self) -> bool {
        self.inner.borrow().waiting
    }

    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    pub fn state(&self) -> RunState {
        self.inner.borrow().state()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.inner.borrow().mode
    }

    pub fn speed_factor(&self) -> f64 {
        self.inner.borrow().speed_factor
    }

    /// Delay used between auto-mode steps at the current speed.
    pub fn step_delay(&self) -> Duration {
        self.inner.borrow().step_delay()
    }

    /// Index of the next step to execute.
    pub fn current_index(&self) -> usize {
        self.inner.borrow().index
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().steps.is_empty()
    }

    fn execute_next_step(&self) {
        let (step, index, total, epoch) = {
            let mut inner = self.inner.borrow_mut();
            if !inner.running {
                return;
            }
            if inner.index >= inner.steps.len() {
                drop(inner);
                self.complete();
                return;
            }
            let index = inner.index;
            inner.index += 1;
            (
                Rc::clone(&inner.steps[index]),
                index,
                inner.steps.len(),
                inner.epoch,
            )
        };

        {
            let span = telemetry::enter_step(index, total);
            let _guard = span.enter();
            step();
        }

        let next = {
            let inner = self.inner.borrow();
            if !inner.running || inner.epoch != epoch {
                return;
            }
            if inner.index >= inner.steps.len() {
                None
            } else {
                Some(inner.mode)
            }
        };

        match next {
            None => self.complete(),
            Some(PlaybackMode::Auto) => self.schedule_next(),
            Some(PlaybackMode::StepByStep) => {
                self.inner.borrow_mut().waiting = true;
                telemetry::record_state_transition("running", "waiting");
                self.notify_wait_change(true);
            }
        }
    }

    fn schedule_next(&self) {
        let (delay, epoch) = {
            let inner = self.inner.borrow();
            (inner.step_delay(), inner.epoch)
        };

        let weak: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);
        let scheduler = Rc::downgrade(&self.scheduler);
        let handle = self.scheduler.schedule(
            delay,
            Box::new(move || {
                let (Some(inner), Some(scheduler)) = (weak.upgrade(), scheduler.upgrade()) else {
                    return;
                };
                {
                    let mut state = inner.borrow_mut();
                    if state.epoch != epoch {
                        return;
                    }
                    state.pending_timer = None;
                }
                Sequencer { inner, scheduler }.execute_next_step();
            }),
        );
        self.inner.borrow_mut().pending_timer = Some(handle);
    }

    fn complete(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.running = false;
            inner.completed = true;
        }
        telemetry::record_state_transition("running", "completed");
    }

    fn cancel_timer(&self, inner: &mut Inner) {
        if let Some(handle) = inner.pending_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn notify_wait_change(&self, waiting: bool) {
        let listener = self.inner.borrow().on_wait_change.clone();
        if let Some(listener) = listener {
            listener(waiting);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}
