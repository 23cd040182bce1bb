//! Claude Code record source for ccline
//!
//! Reads the per-session JSONL transcripts Claude Code writes under
//! `~/.claude/projects` and turns them into [`ccline_core::Record`]s.

pub mod data_loader;

pub use data_loader::DataLoader;
