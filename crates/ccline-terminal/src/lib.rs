//! Terminal output helpers for ccline
//!
//! Everything here is pure string formatting apart from
//! [`width::terminal_width`], which asks the terminal for its size.

pub mod bars;
pub mod format;
pub mod style;
pub mod width;

pub use bars::{percentage_tone, percentage_tone_dim, progress_bar, sparkline};
pub use format::{
    format_cost, format_duration, format_token_count, format_token_count_short,
    shorten_model_name,
};
pub use style::{Palette, Tone};
pub use width::{DisplayMode, display_width, strip_ansi, truncate_text, truncate_to_width};
