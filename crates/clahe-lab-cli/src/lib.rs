//! Shared utilities for clahe-lab-cli
//!
//! Argument parsing helpers kept out of main.rs so they stay testable.

pub mod parsers;

pub use parsers::{parse_clip_limits, parse_tile_sizes};
