//! Progress-bar delegate that paints one job row.

use std::collections::HashMap;

use job_core::{JobRow, JobState, JobStatus};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Axis-aligned rectangle in painter units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Drawing surface used by [`ProgressDelegate`].
pub trait Painter {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn draw_text(&mut self, rect: Rect, text: &str);
}

/// Which color each status is drawn in. Statuses without a color get no bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusColors {
    colors: HashMap<JobStatus, Color>,
}

impl StatusColors {
    pub fn empty() -> Self {
        Self {
            colors: HashMap::new(),
        }
    }

    pub fn with(mut self, status: JobStatus, color: Color) -> Self {
        self.colors.insert(status, color);
        self
    }

    pub fn get(&self, status: JobStatus) -> Option<Color> {
        self.colors.get(&status).copied()
    }
}

impl Default for StatusColors {
    fn default() -> Self {
        Self::empty()
            .with(JobStatus::Running, Color::rgb(0x33, 0xa0, 0x2c))
            .with(JobStatus::Error, Color::rgb(0xe3, 0x1a, 0x1c))
            .with(JobStatus::Complete, Color::rgb(0xb2, 0xdf, 0x8a))
            .with(JobStatus::Stopped, Color::rgb(0xca, 0xb2, 0xd6))
    }
}

/// Paints a row as a bar filled to the job's progress, labelled with its id.
#[derive(Debug, Clone, Default)]
pub struct ProgressDelegate {
    colors: StatusColors,
}

impl ProgressDelegate {
    pub fn new(colors: StatusColors) -> Self {
        Self { colors }
    }

    /// Width of the filled part of a bar `total` units wide.
    pub fn fill_width(total: u32, state: &JobState) -> u32 {
        let progress = u64::from(state.progress.min(JobState::MAX_PROGRESS));
        let width = u64::from(total) * progress / u64::from(JobState::MAX_PROGRESS);
        // Never wider than `total`, so the conversion cannot fail.
        u32::try_from(width).unwrap_or(total)
    }

    pub fn paint<P: Painter + ?Sized>(&self, painter: &mut P, rect: Rect, row: &JobRow) {
        if let Some(color) = self.colors.get(row.state.status) {
            let width = Self::fill_width(rect.width, &row.state);
            if width > 0 {
                painter.fill_rect(Rect { width, ..rect }, color);
            }
        }
        painter.draw_text(rect, &row.job_id.to_string());
    }
}
