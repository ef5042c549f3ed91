//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod bundle;
pub mod cdx;
pub mod copy;
pub mod get;
pub mod index;
pub mod lookup;
