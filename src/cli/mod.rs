//! Command-line interface module.

mod args;
pub mod common;
pub mod compile;
pub mod extract;
pub mod image;

pub use args::{Cli, Commands};
