use super::CanvasEffect;
use crate::canvas::{Canvas, CanvasHandle, Context2d, WeakCanvas};
use crate::options::EffectOptions;
use crate::random::RandomSource;
use crate::scheduler::{Clock, Scheduler, SystemClock, Task};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// Minimum time between two rendered frames (roughly).
pub const KEY_FRAME_INTERVAL: Duration = Duration::from_millis(15);
/// Sideways drift per unit of speed, also the left spawn margin.
const ANG_F: f64 = 0.4;
const GLYPH: &str = "🚀";
const FONT: &str = "50px Twemoji";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub thrust: f64,
}

impl Particle {
    pub fn spawn(width: f64, height: f64, rng: &mut dyn RandomSource) -> Self {
        let mut particle = Self::default();
        particle.reset(width, height, rng);
        particle
    }

    /// Places the rocket somewhere below the bottom edge, biased left so the
    /// rightward drift carries it across the canvas.
    pub fn reset(&mut self, width: f64, height: f64, rng: &mut dyn RandomSource) {
        self.x = rng.next_f64() * width - width * ANG_F;
        self.y = rng.next_f64() * height + height;
        self.speed = rng.next_f64() * 2.0 + 1.0;
        self.thrust = rng.next_f64() * 0.3 + 0.2;
    }

    /// One physics step: accelerate, climb, drift right.
    pub fn advance(&mut self) {
        self.speed += self.thrust;
        self.y += -self.speed;
        self.x += ANG_F * self.speed;
    }
}

pub struct RocketsEffect {
    options: EffectOptions,
    // Set only while a run holds a usable 2D context.
    canvas: Option<WeakCanvas>,
    particles: Vec<Particle>,
    last_animation: Option<Duration>,
    running: bool,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
}

impl RocketsEffect {
    pub fn new(options: EffectOptions) -> Self {
        Self::with_sources(
            options,
            Box::new(SystemClock::new()),
            Box::new(fastrand::Rng::new()),
        )
    }

    pub fn with_sources(
        options: EffectOptions,
        clock: Box<dyn Clock>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            options,
            canvas: None,
            particles: Vec::new(),
            last_animation: None,
            running: false,
            clock,
            rng,
        }
    }

    pub fn options(&self) -> &EffectOptions {
        &self.options
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn animate_and_render(&mut self, ctx: &mut dyn Context2d) {
        ctx.set_font(FONT);
        // `&mut self` keeps the live list from changing under the loop.
        for particle in &mut self.particles {
            particle.advance();
            ctx.save();
            ctx.fill_text(GLYPH, particle.x, particle.y);
            ctx.restore();
        }
    }
}

impl CanvasEffect for RocketsEffect {
    fn start(
        &mut self,
        canvas: Option<&CanvasHandle>,
        timeout: Option<Duration>,
        scheduler: &mut dyn Scheduler,
    ) {
        let Some(canvas) = canvas else {
            return;
        };

        let count = self.options.max_count;
        self.particles.clear();
        if self.particles.try_reserve_exact(count).is_err() {
            debug!(count, "cannot allocate that many rockets, not starting");
            return;
        }

        let (width, height) = {
            let Ok(mut surface) = canvas.try_borrow_mut() else {
                debug!("canvas is busy, not starting");
                return;
            };
            let has_context = surface.context_2d().is_some();
            self.canvas = has_context.then(|| Rc::downgrade(canvas));
            (surface.width() as f64, surface.height() as f64)
        };
        if self.canvas.is_none() {
            debug!("canvas has no 2d context, nothing will be drawn");
        }

        self.last_animation = None;
        while self.particles.len() < count {
            self.particles
                .push(Particle::spawn(width, height, self.rng.as_mut()));
        }

        self.running = true;
        debug!(count, width, height, ?timeout, "rockets started");
        scheduler.schedule_next_frame();
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            scheduler.schedule_after(timeout, Task::Stop);
        }
    }

    fn stop(&mut self) {
        if self.running {
            debug!("rockets stopping");
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn render_frame(&mut self, scheduler: &mut dyn Scheduler) {
        let Some(canvas) = self.canvas.as_ref().and_then(|weak| weak.upgrade()) else {
            trace!("canvas gone, frame loop ends");
            return;
        };
        let Ok(mut surface) = canvas.try_borrow_mut() else {
            // Host is holding the surface right now; try again next frame.
            scheduler.schedule_next_frame();
            return;
        };
        let (width, height) = (surface.width() as f64, surface.height() as f64);
        let Some(ctx) = surface.context_2d() else {
            trace!("2d context gone, frame loop ends");
            return;
        };

        if self.particles.is_empty() || !self.running {
            ctx.clear_rect(0.0, 0.0, width, height);
            self.particles.clear();
            self.canvas = None;
            debug!("rockets finished");
            return;
        }

        let now = self.clock.now();
        let due = self
            .last_animation
            .is_none_or(|last| now.saturating_sub(last) >= KEY_FRAME_INTERVAL);
        if due {
            ctx.clear_rect(0.0, 0.0, width, height);
            self.last_animation = Some(now);
            self.animate_and_render(ctx);
        } else {
            trace!("frame throttled");
        }

        scheduler.schedule_next_frame();
    }
}
