//! Stable exit codes for the scaffolder CLI.

use crate::core::state::{WorkflowResult, WorkflowState};
use crate::core::types::Stage;

/// Project created and dependencies installed.
pub const OK: i32 = 0;
/// Invalid config, invalid project name, or another error before the workflow started.
pub const INVALID: i32 = 1;
/// Command-line usage error (emitted by the argument parser).
pub const USAGE: i32 = 2;
/// Template could not be copied (missing source or unusable destination).
pub const COPY_FAILED: i32 = 3;
/// The package tool is missing or not runnable.
pub const TOOL_UNAVAILABLE: i32 = 4;
/// The dependency install command failed.
pub const INSTALL_FAILED: i32 = 5;

/// Exit code for a terminal workflow result.
///
/// Per-entry copy failures do not affect the code of a finished run.
pub fn for_result(result: &WorkflowResult) -> i32 {
    match &result.state {
        WorkflowState::Failed { stage, .. } => match stage {
            Stage::Init => INVALID,
            Stage::Copying => COPY_FAILED,
            Stage::ToolCheck => TOOL_UNAVAILABLE,
            Stage::Installing => INSTALL_FAILED,
        },
        _ => OK,
    }
}
