//! Drawing surfaces the effects render onto.
//!
//! A [`Canvas`] is owned by the host. Effects only ever hold a [`Weak`]
//! reference to it for the duration of a run, so the host tears a surface
//! down by dropping its [`CanvasHandle`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Immediate-mode 2D drawing context.
pub trait Context2d {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn set_font(&mut self, font: &str);
    /// Draws `text` with its baseline origin at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    fn save(&mut self);
    fn restore(&mut self);
}

pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Returns `None` when the surface cannot hand out a 2D context.
    fn context_2d(&mut self) -> Option<&mut dyn Context2d>;
}

pub type CanvasHandle = Rc<RefCell<dyn Canvas>>;
pub type WeakCanvas = Weak<RefCell<dyn Canvas>>;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    SetFont(String),
    FillText { text: String, x: f64, y: f64 },
    Save,
    Restore,
}

impl fmt::Display for DrawOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawOp::ClearRect { x, y, width, height } => {
                write!(f, "clear_rect {x:.2} {y:.2} {width:.2} {height:.2}")
            }
            DrawOp::SetFont(font) => write!(f, "set_font {font}"),
            DrawOp::FillText { text, x, y } => write!(f, "fill_text {text} {x:.2} {y:.2}"),
            DrawOp::Save => write!(f, "save"),
            DrawOp::Restore => write!(f, "restore"),
        }
    }
}

/// Headless canvas that records every drawing call instead of rasterizing.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    has_context: bool,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            has_context: true,
            ops: Vec::new(),
        }
    }

    /// A surface whose `context_2d` always fails.
    pub fn without_context(width: u32, height: u32) -> Self {
        Self {
            has_context: false,
            ..Self::new(width, height)
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// One line per recorded call, handy for snapshots.
    pub fn transcript(&self) -> String {
        self.ops
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::ClearRect { .. }))
            .count()
    }
}

impl Context2d for RecordingCanvas {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(DrawOp::ClearRect { x, y, width, height });
    }

    fn set_font(&mut self, font: &str) {
        self.ops.push(DrawOp::SetFont(font.to_string()));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn save(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(DrawOp::Restore);
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn context_2d(&mut self) -> Option<&mut dyn Context2d> {
        if self.has_context { Some(self) } else { None }
    }
}
