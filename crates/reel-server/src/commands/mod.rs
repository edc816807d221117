//! CLI command implementations for the `reel` binary.

pub mod delete;
pub mod list;
pub mod record;
pub mod serve;
