//! # gitguard
//!
//! A git-workflow assistant that inspects staged changes or branch diffs
//! and produces structured guidance: complexity scoring, commit/PR split
//! suggestions, security findings, and budget-gated AI commit messages.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gitguard::analysis::{analyze, FileChange};
//! use gitguard::config::GitGuardConfig;
//!
//! let config = GitGuardConfig::default();
//! let files = vec![FileChange::new("packages/core/src/index.ts", 12, 3)];
//! let result = analyze(files, "", &config);
//! println!("complexity score: {}", result.complexity.score);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod ai;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod git;
pub mod template;

pub use crate::cli::Cli;

/// The current version of gitguard.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
