//! Project scaffolder: copies a bundled template into `<cwd>/<name>`, then
//! checks for the package tool and installs dependencies.
//!
//! The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (data model, workflow state
//!   machine, name validation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (tree copy, child processes,
//!   configuration). Process spawning sits behind a trait so tests can
//!   substitute scripted runners.
//!
//! [`workflow`] coordinates core logic with I/O to implement `init`;
//! [`report`] renders its events for the console.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
