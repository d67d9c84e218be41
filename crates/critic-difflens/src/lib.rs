//! Unified diff parsing and path filtering.
//!
//! Turns raw diff text into files, hunks and lines that carry both file line
//! numbers and GitHub review positions, then drops excluded paths before
//! anything is sent to the model.

pub mod filter;
pub mod parser;
