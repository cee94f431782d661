//! Shared deterministic types for the scaffolding workflow.
//!
//! These types define the contracts between the tree copier, the tool
//! pipeline and the orchestrator. They hold no I/O handles, so they can be
//! cloned, compared and asserted on directly in tests.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One `init` invocation, resolved to absolute paths. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInitRequest {
    pub name: String,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
}

/// Node kinds the copier replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A path as observed on disk at the moment it was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Permission bits (`0o7777` mask on Unix).
    pub mode: u32,
}

/// Result of replicating a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied {
        source: PathBuf,
        dest: PathBuf,
        mode: u32,
    },
    DirectoryCreated {
        dest: PathBuf,
        mode: u32,
    },
    /// The entry (and, for directories, possibly its subtree) was not replicated.
    Failed { path: PathBuf, reason: String },
}

/// Per-entry outcomes of one tree copy, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub outcomes: Vec<CopyOutcome>,
}

impl CopyReport {
    pub fn push(&mut self, outcome: CopyOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn files_copied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CopyOutcome::Copied { .. }))
            .count()
    }

    pub fn directories_created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CopyOutcome::DirectoryCreated { .. }))
            .count()
    }

    /// `(path, reason)` for every entry that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            CopyOutcome::Failed { path, reason } => Some((path, reason.as_str())),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Presence of the external package tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Available { version: String },
    Unavailable { reason: String },
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available { .. })
    }
}

/// Result of the dependency install step.
///
/// `stderr` on success is diagnostic output only; failure is decided by the
/// exit status alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Succeeded { stdout: String, stderr: String },
    Failed { reason: String },
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Succeeded { .. })
    }
}

/// Non-terminal workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Init,
    Copying,
    ToolCheck,
    Installing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Init => "init",
            Stage::Copying => "copy",
            Stage::ToolCheck => "tool check",
            Stage::Installing => "install",
        };
        f.write_str(label)
    }
}

/// Fatal, stage-level failure. Halts the workflow; prior side effects stay on disk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    #[error("invalid project request: {0}")]
    InvalidRequest(String),

    #[error("template source {} not found", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("copy aborted: {0}")]
    CopyAborted(String),

    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    #[error("dependency install failed: {0}")]
    InstallFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_report_counts_by_outcome() {
        let mut report = CopyReport::default();
        report.push(CopyOutcome::DirectoryCreated {
            dest: PathBuf::from("dest/sub"),
            mode: 0o755,
        });
        report.push(CopyOutcome::Copied {
            source: PathBuf::from("src/a.txt"),
            dest: PathBuf::from("dest/a.txt"),
            mode: 0o644,
        });
        report.push(CopyOutcome::Failed {
            path: PathBuf::from("src/locked.txt"),
            reason: "permission denied".to_string(),
        });

        assert_eq!(report.files_copied(), 1);
        assert_eq!(report.directories_created(), 1);
        assert_eq!(report.failure_count(), 1);
        let (path, reason) = report.failures().next().expect("failure");
        assert_eq!(path, &PathBuf::from("src/locked.txt"));
        assert_eq!(reason, "permission denied");
    }

    #[test]
    fn stage_failure_messages_are_human_readable() {
        let failure = StageFailure::ToolUnavailable {
            tool: "npm".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(failure.to_string(), "npm is not available: not found");

        let failure = StageFailure::SourceNotFound {
            path: PathBuf::from("/opt/template"),
        };
        assert_eq!(failure.to_string(), "template source /opt/template not found");
    }
}
