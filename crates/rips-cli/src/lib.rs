//! Library components of the `rips` command-line tool.

pub mod config;
pub mod logging;
