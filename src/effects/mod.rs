use std::time::Duration;

use crate::canvas::CanvasHandle;
use crate::scheduler::{Scheduler, Task};

pub mod rockets;

/// How long an effect runs when the host does not say otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// A timed visual effect drawn onto a host-owned canvas.
///
/// None of these calls fail. A cosmetic effect must never interrupt its host,
/// so every bad input degrades to a silent no-op.
pub trait CanvasEffect {
    /// Begins the effect on `canvas`. A `None` canvas does nothing.
    /// A non-zero `timeout` schedules an automatic [`Task::Stop`].
    fn start(
        &mut self,
        canvas: Option<&CanvasHandle>,
        timeout: Option<Duration>,
        scheduler: &mut dyn Scheduler,
    );

    /// Requests termination. Safe to call at any time, any number of times.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Frame callback target for [`Task::RenderFrame`].
    fn render_frame(&mut self, scheduler: &mut dyn Scheduler);

    fn run_task(&mut self, task: Task, scheduler: &mut dyn Scheduler) {
        match task {
            Task::RenderFrame => self.render_frame(scheduler),
            Task::Stop => self.stop(),
        }
    }
}
