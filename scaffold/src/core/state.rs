//! Workflow state machine.
//!
//! `Init -> Copying -> ToolCheck -> Installing -> Done`, with a terminal
//! `Failed` reachable from every non-terminal state. Transitions are pure so
//! the orchestrator can be checked against them without touching disk.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::types::{CopyReport, InstallOutcome, Stage, StageFailure, ToolStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    Copying,
    ToolCheck,
    Installing,
    Done,
    Failed { stage: Stage, failure: StageFailure },
}

/// Attempted to leave `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no transition out of terminal state {state}")]
pub struct TransitionError {
    pub state: WorkflowState,
}

impl WorkflowState {
    /// Stage currently executing, or `None` once terminal.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkflowState::Init => Some(Stage::Init),
            WorkflowState::Copying => Some(Stage::Copying),
            WorkflowState::ToolCheck => Some(Stage::ToolCheck),
            WorkflowState::Installing => Some(Stage::Installing),
            WorkflowState::Done | WorkflowState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage().is_none()
    }

    /// Move to the next stage after the current one succeeded.
    pub fn advance(&self) -> Result<WorkflowState, TransitionError> {
        let next = match self {
            WorkflowState::Init => WorkflowState::Copying,
            WorkflowState::Copying => WorkflowState::ToolCheck,
            WorkflowState::ToolCheck => WorkflowState::Installing,
            WorkflowState::Installing => WorkflowState::Done,
            WorkflowState::Done | WorkflowState::Failed { .. } => {
                return Err(TransitionError {
                    state: self.clone(),
                });
            }
        };
        Ok(next)
    }

    /// Halt in the current stage.
    pub fn fail(&self, failure: StageFailure) -> Result<WorkflowState, TransitionError> {
        match self.stage() {
            Some(stage) => Ok(WorkflowState::Failed { stage, failure }),
            None => Err(TransitionError {
                state: self.clone(),
            }),
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Init => f.write_str("init"),
            WorkflowState::Copying => f.write_str("copying"),
            WorkflowState::ToolCheck => f.write_str("tool-check"),
            WorkflowState::Installing => f.write_str("installing"),
            WorkflowState::Done => f.write_str("done"),
            WorkflowState::Failed { stage, failure } => {
                write!(f, "failed({stage}: {failure})")
            }
        }
    }
}

/// Terminal record of one workflow run.
///
/// Stage results are `Some` once their stage ran, whether or not it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowResult {
    pub name: String,
    /// Resolved destination; `None` if the run failed before resolving it.
    pub dest_dir: Option<PathBuf>,
    /// `Done` or `Failed`.
    pub state: WorkflowState,
    /// Stages that completed successfully, in order.
    pub completed: Vec<Stage>,
    pub copy_report: Option<CopyReport>,
    pub tool: Option<ToolStatus>,
    pub install: Option<InstallOutcome>,
}

impl WorkflowResult {
    pub fn is_done(&self) -> bool {
        self.state == WorkflowState::Done
    }

    pub fn failure(&self) -> Option<(Stage, &StageFailure)> {
        match &self.state {
            WorkflowState::Failed { stage, failure } => Some((*stage, failure)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_stages_in_order() {
        let mut state = WorkflowState::Init;
        let mut seen = Vec::new();
        while let Some(stage) = state.stage() {
            seen.push(stage);
            state = state.advance().expect("advance");
        }
        assert_eq!(
            seen,
            vec![
                Stage::Init,
                Stage::Copying,
                Stage::ToolCheck,
                Stage::Installing
            ]
        );
        assert_eq!(state, WorkflowState::Done);
    }

    #[test]
    fn fail_records_current_stage() {
        let failure = StageFailure::InstallFailure("exit 1".to_string());
        let state = WorkflowState::Installing
            .fail(failure.clone())
            .expect("fail");
        assert_eq!(
            state,
            WorkflowState::Failed {
                stage: Stage::Installing,
                failure,
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let failed = WorkflowState::Copying
            .fail(StageFailure::CopyAborted("boom".to_string()))
            .expect("fail");

        assert!(WorkflowState::Done.advance().is_err());
        assert!(failed.advance().is_err());
        let err = WorkflowState::Done
            .fail(StageFailure::CopyAborted("late".to_string()))
            .unwrap_err();
        assert_eq!(err.state, WorkflowState::Done);
    }
}
