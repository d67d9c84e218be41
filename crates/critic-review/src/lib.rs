//! Diff-to-comment review pipeline.
//!
//! Turns a pull request event into at most one GitHub review: prompt
//! construction per hunk, the completion call, extraction of the model's
//! JSON, and mapping findings back onto diff positions.

pub mod event;
pub mod extract;
pub mod github;
pub mod llm;
pub mod mapper;
pub mod pipeline;
pub mod prompt;
