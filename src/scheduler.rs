//! Frame and timer scheduling for canvas effects.
//!
//! Everything runs on one thread. Effects never get called back directly:
//! they enqueue [`Task`]s and the host hands each due task back to the
//! effect through [`FrameQueue::dispatch`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::effects::CanvasEffect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    RenderFrame,
    Stop,
}

pub trait Scheduler {
    /// Runs [`Task::RenderFrame`] once before the next display repaint.
    fn schedule_next_frame(&mut self);
    /// Runs `task` once, no earlier than `delay` from now.
    fn schedule_after(&mut self, delay: Duration, task: Task);
}

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug)]
struct Timer {
    due: Duration,
    task: Task,
}

/// Single-threaded event queue: pending frame requests plus deferred timers.
pub struct FrameQueue {
    clock: Box<dyn Clock>,
    frame_requests: usize,
    timers: Vec<Timer>,
}

impl FrameQueue {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            frame_requests: 0,
            timers: Vec::new(),
        }
    }

    pub fn pending_frames(&self) -> usize {
        self.frame_requests
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Nothing left to run: no frame requested and no timer armed.
    pub fn is_idle(&self) -> bool {
        self.frame_requests == 0 && self.timers.is_empty()
    }

    /// Removes and returns the tasks due for this frame.
    ///
    /// Expired timers come first, ordered by due time, followed by one
    /// [`Task::RenderFrame`] per frame request. Anything scheduled while the
    /// returned tasks run lands in the next frame.
    pub fn take_due(&mut self) -> Vec<Task> {
        let now = self.clock.now();
        let (mut expired, pending): (Vec<Timer>, Vec<Timer>) = std::mem::take(&mut self.timers)
            .into_iter()
            .partition(|timer| timer.due <= now);
        self.timers = pending;
        expired.sort_by_key(|timer| timer.due);

        let frames = std::mem::take(&mut self.frame_requests);
        let mut due: Vec<Task> = expired.into_iter().map(|timer| timer.task).collect();
        due.extend(std::iter::repeat_n(Task::RenderFrame, frames));
        due
    }

    /// Runs one display frame's worth of tasks against `effect`.
    /// Returns how many tasks ran.
    pub fn dispatch(&mut self, effect: &mut dyn CanvasEffect) -> usize {
        let due = self.take_due();
        let count = due.len();
        for task in due {
            trace!(?task, "dispatching");
            effect.run_task(task, self);
        }
        count
    }
}

impl Scheduler for FrameQueue {
    fn schedule_next_frame(&mut self) {
        self.frame_requests += 1;
    }

    fn schedule_after(&mut self, delay: Duration, task: Task) {
        let due = self.clock.now() + delay;
        self.timers.push(Timer { due, task });
    }
}
