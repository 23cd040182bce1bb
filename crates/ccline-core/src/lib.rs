//! Core types and algorithms for ccline
//!
//! Records are loaded by a [`provider::RecordSource`], grouped into five-hour
//! windows by [`window::WindowDetector`] and summarized by
//! [`aggregation::aggregate`]. The [`cache`] and [`lock`] modules keep
//! repeated statusline invocations cheap.

pub mod aggregation;
pub mod cache;
pub mod error;
pub mod lock;
pub mod provider;
pub mod timezone;
pub mod types;
pub mod window;

#[cfg(test)]
pub mod test_utils;

pub use aggregation::{MessageCounts, WindowStatistics, aggregate};
pub use error::{CclineError, Result};
pub use types::{ConversationUsage, ModelName, Record, RecordType, SessionId, TokenCounts};
pub use window::{Window, WindowDetector, select_window};
