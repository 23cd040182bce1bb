//! Progress bars and sparklines

use crate::style::{Palette, Tone};

const FILLED: char = '█';
const EMPTY: char = '▒';
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Color for a usage percentage: red from 90, yellow from 80
pub fn percentage_tone(percentage: f64) -> Tone {
    if percentage >= 90.0 {
        Tone::BrightRed
    } else if percentage >= 80.0 {
        Tone::BrightYellow
    } else {
        Tone::BrightGreen
    }
}

/// Non-bold variant of [`percentage_tone`]
pub fn percentage_tone_dim(percentage: f64) -> Tone {
    match percentage_tone(percentage) {
        Tone::BrightRed => Tone::DimRed,
        Tone::BrightYellow => Tone::DimYellow,
        _ => Tone::DimGreen,
    }
}

/// A bar of exactly `width` cells
///
/// Whole cells are bright, a partly filled cell is drawn dim, and the rest
/// is shaded.
pub fn progress_bar(palette: &Palette, percentage: f64, width: usize) -> String {
    let pct = percentage.clamp(0.0, 100.0);
    let exact = width as f64 * pct / 100.0;
    let filled = (exact.floor() as usize).min(width);
    let partial = usize::from(filled < width && exact - filled as f64 > 0.0);
    let empty = width - filled - partial;

    let mut bar = palette.paint(&FILLED.to_string().repeat(filled), percentage_tone(pct));
    if partial == 1 {
        bar.push_str(&palette.paint(&FILLED.to_string(), percentage_tone_dim(pct)));
    }
    bar.push_str(&palette.paint(&EMPTY.to_string().repeat(empty), Tone::Gray));
    bar
}

/// A sparkline of at most `width` cells
///
/// Inputs longer than `width` are down-sampled by index.
pub fn sparkline(palette: &Palette, values: &[u64], width: usize) -> String {
    if values.is_empty() || width == 0 {
        return String::new();
    }
    let cells = width.min(values.len());
    let max = values.iter().copied().max().unwrap_or(0);
    let min = values.iter().copied().min().unwrap_or(0);

    if max == min {
        return if max == 0 {
            palette.paint(&SPARK_LEVELS[0].to_string().repeat(cells), Tone::Gray)
        } else {
            palette.paint(&SPARK_LEVELS[4].to_string().repeat(cells), Tone::BrightGreen)
        };
    }

    let step = values.len() as f64 / cells as f64;
    let range = (max - min) as f64;
    (0..cells)
        .map(|i| {
            let index = ((i as f64 * step) as usize).min(values.len() - 1);
            let normalized = (values[index] - min) as f64 / range;
            let level = ((normalized * SPARK_LEVELS.len() as f64) as usize).min(SPARK_LEVELS.len() - 1);
            let tone = if normalized > 0.7 {
                Tone::BrightRed
            } else if normalized > 0.4 {
                Tone::BrightYellow
            } else {
                Tone::BrightGreen
            };
            palette.paint(&SPARK_LEVELS[level].to_string(), tone)
        })
        .collect()
}
