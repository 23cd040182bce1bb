//! Cost calculator for token usage
//!
//! The model family is picked by a case-insensitive substring match in a
//! fixed order: `haiku`, then `sonnet`, and everything else is billed as
//! Opus. Unknown models therefore show the highest plausible cost rather
//! than the lowest.
//!
//! # Examples
//!
//! ```
//! use ccline_pricing::cost_calculator::{CostCalculator, ModelFamily};
//! use ccline_core::types::TokenCounts;
//!
//! let tokens = TokenCounts::new(1_000_000, 100_000, 0, 0);
//! let cost = CostCalculator::calculate(&tokens, Some("Sonnet 4.5"), None);
//! assert!((cost - 4.5).abs() < 1e-9);
//!
//! assert_eq!(ModelFamily::detect(Some("claude-3-5-haiku"), None), ModelFamily::Haiku);
//! ```

use ccline_core::types::TokenCounts;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TOKENS_PER_RATE_UNIT: f64 = 1_000_000.0;

/// Model families with distinct pricing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelFamily {
    /// Detect the family from a display name and/or model id
    pub fn detect(display_name: Option<&str>, model_id: Option<&str>) -> Self {
        let names: Vec<String> = [display_name, model_id]
            .into_iter()
            .flatten()
            .map(str::to_lowercase)
            .collect();
        let mentions = |needle: &str| names.iter().any(|n| n.contains(needle));

        if mentions("haiku") {
            Self::Haiku
        } else if mentions("sonnet") {
            Self::Sonnet
        } else {
            Self::Opus
        }
    }

    pub fn rates(self) -> ModelRates {
        match self {
            Self::Haiku => ModelRates {
                input: 1.00,
                output: 5.00,
                cache_write: 1.25,
                cache_read: 0.10,
            },
            Self::Sonnet => ModelRates {
                input: 3.00,
                output: 15.00,
                cache_write: 3.75,
                cache_read: 0.30,
            },
            Self::Opus => ModelRates {
                input: 15.00,
                output: 75.00,
                cache_write: 18.75,
                cache_read: 1.50,
            },
        }
    }
}

/// Dollars per million tokens for each token class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl ModelRates {
    fn cost_of(&self, input: u64, output: u64, cache_write: u64, cache_read: u64) -> f64 {
        (input as f64 * self.input
            + output as f64 * self.output
            + cache_write as f64 * self.cache_write
            + cache_read as f64 * self.cache_read)
            / TOKENS_PER_RATE_UNIT
    }
}

/// Estimate the cost of raw token counts
///
/// Negative counts are treated as zero.
pub fn estimate_cost(
    input: i64,
    output: i64,
    cache_write: i64,
    cache_read: i64,
    model_name: &str,
) -> f64 {
    let clamp = |n: i64| n.max(0) as u64;
    ModelFamily::detect(Some(model_name), None).rates().cost_of(
        clamp(input),
        clamp(output),
        clamp(cache_write),
        clamp(cache_read),
    )
}

/// Cost calculation over canonical token counts
pub struct CostCalculator;

impl CostCalculator {
    /// Cost of `tokens` for the model named by `display_name` or `model_id`
    pub fn calculate(tokens: &TokenCounts, display_name: Option<&str>, model_id: Option<&str>) -> f64 {
        let family = ModelFamily::detect(display_name, model_id);
        let cost = family.rates().cost_of(
            tokens.input_tokens,
            tokens.output_tokens,
            tokens.cache_creation_tokens,
            tokens.cache_read_tokens,
        );
        debug!(
            "Calculated cost: ${:.6} for {} total tokens ({:?})",
            cost,
            tokens.total(),
            family
        );
        cost
    }
}
