//! Side-effecting helpers: filesystem copy, child processes, configuration.

pub mod config;
pub mod copy;
pub mod entry;
pub mod install;
pub mod process;
pub mod tool;
