//! Core types, configuration, and error handling for critic.
//!
//! This crate provides the shared foundation used by the other critic crates:
//! - [`CriticError`]: unified error type using `thiserror`
//! - [`CriticConfig`]: configuration loaded from `.critic.toml`
//! - Shared types: [`PullRequestContext`], [`ReviewComment`]

mod config;
mod error;
mod types;

pub use config::{
    split_patterns, CriticConfig, GitHubConfig, LlmConfig, PromptStyle, ReviewConfig,
    SamplingParams,
};
pub use error::CriticError;
pub use types::{PullRequestContext, ReviewComment};

/// A convenience `Result` type for critic operations.
pub type Result<T> = std::result::Result<T, CriticError>;
