//! Character-cell painter for terminals.

use crate::delegate::{Color, Painter, ProgressDelegate, Rect};
use crate::list_model::JobListModel;

const FILL: char = '█';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cell {
    fill: Option<Color>,
    text: Option<char>,
}

/// A grid of cells; one unit of [`Rect`] is one cell.
#[derive(Debug, Clone)]
pub struct TextPainter {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl TextPainter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); (width as usize).saturating_mul(height as usize)],
        }
    }

    fn cell_mut(&mut self, x: u32, y: u32) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            self.cells
                .get_mut(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    fn lines(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.width.max(1) as usize)
    }

    /// Plain text: filled cells become `█` unless text is drawn over them.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            let text: String = line
                .iter()
                .map(|cell| match (cell.text, cell.fill) {
                    (Some(c), _) => c,
                    (None, Some(_)) => FILL,
                    (None, None) => ' ',
                })
                .collect();
            out.push_str(text.trim_end());
            out.push('\n');
        }
        out
    }

    /// Text with 24-bit ANSI background colors for filled cells.
    pub fn render_ansi(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            let mut current: Option<Color> = None;
            for cell in line {
                if cell.fill != current {
                    match cell.fill {
                        Some(c) => out.push_str(&format!("\x1b[48;2;{};{};{}m", c.r, c.g, c.b)),
                        None => out.push_str("\x1b[0m"),
                    }
                    current = cell.fill;
                }
                out.push(cell.text.unwrap_or(' '));
            }
            if current.is_some() {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
        out
    }
}

impl Painter for TextPainter {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        for y in rect.y..rect.y.saturating_add(rect.height) {
            for x in rect.x..rect.x.saturating_add(rect.width) {
                if let Some(cell) = self.cell_mut(x, y) {
                    cell.fill = Some(color);
                }
            }
        }
    }

    fn draw_text(&mut self, rect: Rect, text: &str) {
        for (x, c) in (rect.x..rect.x.saturating_add(rect.width)).zip(text.chars()) {
            if let Some(cell) = self.cell_mut(x, rect.y) {
                cell.text = Some(c);
            }
        }
    }
}

/// Paint every row of `model` as a one-line bar `width` cells wide.
pub fn paint_list(model: &JobListModel, delegate: &ProgressDelegate, width: u32) -> TextPainter {
    let height = u32::try_from(model.row_count()).unwrap_or(u32::MAX);
    let mut painter = TextPainter::new(width, height);
    for (y, row) in (0..height).zip(model.iter()) {
        delegate.paint(&mut painter, Rect::new(0, y, width, 1), row);
    }
    painter
}
