//! Timer Scheduling
//!
//! The sequencer never touches a timer primitive directly. It asks a
//! [`Scheduler`] to run a task after a delay and keeps the returned
//! [`TimerHandle`] so the task can be cancelled.
//!
//! - [`VirtualScheduler`]: deterministic virtual clock, advanced by hand
//! - [`TokioScheduler`]: real timers on a tokio `LocalSet`

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

/// A deferred unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce()>;

/// Opaque handle identifying a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Single-threaded "invoke this after N ms" seam.
pub trait Scheduler {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Cancel a task. Cancelling a task that already ran is a no-op.
    fn cancel(&self, handle: TimerHandle);
}

struct PendingTask {
    handle: TimerHandle,
    due: Duration,
    delay: Duration,
    task: Task,
}

/// Scheduler driven by a virtual clock.
///
/// Time only moves when [`advance`](Self::advance) or
/// [`run_until_idle`](Self::run_until_idle) is called. Tasks due at the
/// same instant run in the order they were scheduled.
#[derive(Default)]
pub struct VirtualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<PendingTask>>,
    history: RefCell<Vec<Duration>>,
}

impl VirtualScheduler {
    /// Create a scheduler with the clock at zero.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Current virtual time since creation.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of tasks waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Delays of every task ever scheduled, in scheduling order.
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.history.borrow().clone()
    }

    /// Move the clock forward by `by`, running every task that falls due.
    ///
    /// Tasks scheduled by a running task are eligible in the same call if
    /// they fall due before the target time. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut ran = 0;

        while let Some(task) = self.pop_due(Some(target)) {
            self.now.set(task.due.max(self.now.get()));
            (task.task)();
            ran += 1;
        }

        self.now.set(target);
        ran
    }

    /// Run tasks in due order until nothing is pending or `max_tasks` ran.
    pub fn run_until_idle(&self, max_tasks: usize) -> usize {
        let mut ran = 0;
        while ran < max_tasks {
            let Some(task) = self.pop_due(None) else {
                break;
            };
            self.now.set(task.due.max(self.now.get()));
            (task.task)();
            ran += 1;
        }
        ran
    }

    /// Delay of the next task to fire, if any.
    pub fn next_delay(&self) -> Option<Duration> {
        self.pending
            .borrow()
            .iter()
            .min_by_key(|p| (p.due, p.handle.0))
            .map(|p| p.delay)
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<PendingTask> {
        let mut pending = self.pending.borrow_mut();
        let idx = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| limit.map_or(true, |l| p.due <= l))
            .min_by_key(|(_, p)| (p.due, p.handle.0))
            .map(|(i, _)| i)?;
        Some(pending.remove(idx))
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handle = TimerHandle(id);

        self.history.borrow_mut().push(delay);
        self.pending.borrow_mut().push(PendingTask {
            handle,
            due: self.now.get() + delay,
            delay,
            task,
        });
        trace!(timer = id, delay_ms = delay.as_millis() as u64, "Virtual timer scheduled");
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending.borrow_mut().retain(|p| p.handle != handle);
    }
}

/// Scheduler backed by `tokio::time::sleep` on the current `LocalSet`.
///
/// Tasks are spawned with `spawn_local`, so `schedule` must be called from
/// inside a `LocalSet`.
#[derive(Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    tasks: Rc<RefCell<HashMap<u64, tokio::task::AbortHandle>>>,
}

impl TokioScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn pending_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let tasks = Rc::clone(&self.tasks);
        let join = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            tasks.borrow_mut().remove(&id);
            task();
        });
        self.tasks.borrow_mut().insert(id, join.abort_handle());
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(abort) = self.tasks.borrow_mut().remove(&handle.0) {
            abort.abort();
        }
    }
}
