//! ccline - Multi-line statusline for Claude Code
//!
//! Claude Code runs the `ccline` binary on every refresh and pipes a JSON
//! description of the session to it. This library turns that payload into up
//! to four lines:
//!
//! 1. model, git branch, directory, message count and cost
//! 2. context window usage
//! 3. position inside the current five-hour usage window
//! 4. token burn over the window
//!
//! Window detection and aggregation live in `ccline-core`, transcript
//! loading in `ccline-provider-claude`, and the drawing primitives in
//! `ccline-terminal`.
//!
//! # Examples
//!
//! ```no_run
//! use ccline::{cli::RenderArgs, config::{EnvSnapshot, StatuslineConfig}, statusline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StatuslineConfig::resolve(&RenderArgs::default(), &EnvSnapshot::from_env())?;
//!     let payload = r#"{"session_id": "abc", "model": {"display_name": "Opus 4.6"}}"#;
//!     for line in statusline::generate(&config, payload, chrono::Utc::now()).await? {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod command;
pub mod config;
pub mod error_log;
pub mod git;
pub mod install;
pub mod schedule;
pub mod session;
pub mod statusline;
pub mod usage_api;

pub use ccline_core::error::{CclineError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
