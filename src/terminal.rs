use std::io::Write;

use crate::canvas::{Canvas, Context2d};

/// Virtual pixels per terminal cell. Roughly a common monospace glyph box.
pub const CELL_WIDTH: u32 = 8;
pub const CELL_HEIGHT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Empty,
    Glyph(char),
    // Right half of a double-width glyph
    Continuation,
}

/// A canvas backed by the terminal's character grid.
///
/// Coordinates are virtual pixels, `CELL_WIDTH x CELL_HEIGHT` per cell, so
/// effects written for pixel surfaces keep their proportions.
pub struct TerminalCanvas {
    cols: usize,
    rows: usize,
    cells: Vec<Cell>,
    font: String,
    saved_fonts: Vec<String>,
    bg_color: Option<(u8, u8, u8)>,
    output_buf: Vec<u8>,
}

impl TerminalCanvas {
    pub fn new(cols: usize, rows: usize, bg_color: Option<(u8, u8, u8)>) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::Empty; cols * rows],
            font: String::from("10px sans-serif"),
            saved_fonts: Vec::new(),
            bg_color,
            output_buf: Vec::with_capacity(cols * rows * 4),
        }
    }

    /// Resizes the grid in place. Content is dropped; the next frame redraws it.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells.clear();
        self.cells.resize(cols * rows, Cell::Empty);
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    /// The glyph occupying `(col, row)`, if any. Continuation cells report
    /// nothing.
    pub fn glyph_at(&self, col: usize, row: usize) -> Option<char> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        match self.cells[row * self.cols + col] {
            Cell::Glyph(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|cell| *cell == Cell::Empty)
    }

    /// Writes the whole grid to `out` and flushes.
    pub fn present<W: Write>(&mut self, out: &mut W) -> std::io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H"); // Move to home

        let mut utf8 = [0u8; 4];
        for row in 0..self.rows {
            if let Some((r, g, b)) = self.bg_color {
                write!(self.output_buf, "\x1b[48;2;{};{};{}m", r, g, b)?;
            }
            for col in 0..self.cols {
                match self.cells[row * self.cols + col] {
                    Cell::Empty => self.output_buf.push(b' '),
                    Cell::Glyph(c) => self
                        .output_buf
                        .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes()),
                    Cell::Continuation => {}
                }
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            if row + 1 < self.rows {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        out.write_all(&self.output_buf)?;
        out.flush()
    }

    fn set_cell(&mut self, col: usize, row: usize, cell: Cell) {
        let idx = row * self.cols + col;
        // Never leave half of a wide glyph behind.
        match self.cells[idx] {
            Cell::Glyph(old) if glyph_width(old) == 2 && col + 1 < self.cols => {
                self.cells[idx + 1] = Cell::Empty;
            }
            Cell::Continuation if col > 0 => self.cells[idx - 1] = Cell::Empty,
            _ => {}
        }
        self.cells[idx] = cell;
    }
}

/// Terminal columns taken by `c`. Emoji and other pictographs are wide.
fn glyph_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF => 2,
        0xFE30..=0xFE4F | 0xFF00..=0xFF60 | 0xFFE0..=0xFFE6 => 2,
        0x1F300..=0x1F64F | 0x1F680..=0x1F6FF | 0x1F900..=0x1F9FF => 2,
        0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

fn cell_span(start: f64, len: f64, cell: u32, limit: usize) -> std::ops::Range<usize> {
    let cell = cell as f64;
    let first = (start / cell).floor().max(0.0) as usize;
    let last = ((start + len) / cell).ceil().max(0.0) as usize;
    first.min(limit)..last.min(limit)
}

impl Context2d for TerminalCanvas {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let cols = cell_span(x, width, CELL_WIDTH, self.cols);
        let rows = cell_span(y, height, CELL_HEIGHT, self.rows);
        for row in rows {
            for col in cols.clone() {
                self.set_cell(col, row, Cell::Empty);
            }
        }
    }

    fn set_font(&mut self, font: &str) {
        self.font = font.to_string();
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() || x < 0.0 {
            return;
        }
        // Glyphs sit on the baseline, so they land in the cell just above it.
        let row = (y - 1.0) / CELL_HEIGHT as f64;
        if row < 0.0 || row >= self.rows as f64 {
            return;
        }
        let row = row as usize;
        let mut col = (x / CELL_WIDTH as f64) as usize;

        for c in text.chars() {
            let width = glyph_width(c);
            if col + width > self.cols {
                break;
            }
            self.set_cell(col, row, Cell::Glyph(c));
            if width == 2 {
                self.set_cell(col + 1, row, Cell::Continuation);
            }
            col += width;
        }
    }

    fn save(&mut self) {
        self.saved_fonts.push(self.font.clone());
    }

    fn restore(&mut self) {
        if let Some(font) = self.saved_fonts.pop() {
            self.font = font;
        }
    }
}

impl Canvas for TerminalCanvas {
    fn width(&self) -> u32 {
        self.cols as u32 * CELL_WIDTH
    }

    fn height(&self) -> u32 {
        self.rows as u32 * CELL_HEIGHT
    }

    fn context_2d(&mut self) -> Option<&mut dyn Context2d> {
        Some(self)
    }
}
