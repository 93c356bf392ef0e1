//! Display-side projection of the job registry.
//!
//! - `JobListModel` resolves row indexes to jobs
//! - `ProgressDelegate` paints a row as a status-colored progress bar
//! - `TextPainter` is a character-cell `Painter` for terminals

mod delegate;
mod list_model;
mod text_painter;

pub use delegate::{Color, Painter, ProgressDelegate, Rect, StatusColors};
pub use list_model::JobListModel;
pub use text_painter::{TextPainter, paint_list};
