//! Rockets rising across a canvas: a short decorative particle effect.
//!
//! The effect draws through the [`canvas::Canvas`] trait and schedules its
//! frames through [`scheduler::Scheduler`], so any host with a frame loop can
//! run it. The `rockets` binary hosts it in a terminal.

pub mod canvas;
pub mod effects;
pub mod error;
pub mod options;
pub mod random;
pub mod scheduler;
pub mod terminal;

pub use canvas::{Canvas, CanvasHandle, Context2d};
pub use effects::rockets::RocketsEffect;
pub use effects::{CanvasEffect, DEFAULT_TIMEOUT};
pub use error::ConfigError;
pub use options::EffectOptions;
pub use scheduler::{FrameQueue, Scheduler, Task};
