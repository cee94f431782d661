//! Scaffolding workflow orchestration.
//!
//! Drives the [`WorkflowState`] machine through copy, tool check and install.
//! Each stage runs only after the previous one succeeded; a fatal failure
//! halts the run without undoing anything already written to disk. Progress
//! is reported as [`WorkflowEvent`]s to a caller-supplied [`EventSink`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::core::name::validate_project_name;
use crate::core::state::{TransitionError, WorkflowResult, WorkflowState};
use crate::core::types::{InstallOutcome, ProjectInitRequest, Stage, StageFailure, ToolStatus};
use crate::io::config::{ScaffoldConfig, ToolConfig};
use crate::io::copy::copy_tree;
use crate::io::install::install;
use crate::io::process::{CommandRequest, CommandRunner};
use crate::io::tool::check_available;

/// Everything the workflow needs, injected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Template source; relative paths are resolved against the invocation cwd.
    pub template_dir: PathBuf,
    pub tool: ToolConfig,
    pub version_timeout: Duration,
    pub install_timeout: Duration,
    pub output_limit_bytes: usize,
}

impl WorkflowSettings {
    pub fn from_config(config: &ScaffoldConfig, template_dir: PathBuf) -> Self {
        Self {
            template_dir,
            tool: config.tool.clone(),
            version_timeout: config.version_timeout(),
            install_timeout: config.install_timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

/// Progress and outcome notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Started {
        name: String,
        dest_dir: PathBuf,
    },
    CopyStarted {
        source: PathBuf,
        dest: PathBuf,
    },
    /// A single entry failed; the copy continued.
    EntryFailed {
        path: PathBuf,
        reason: String,
    },
    CopyFinished {
        files: usize,
        directories: usize,
        failed: usize,
    },
    ToolDetected {
        program: String,
        version: String,
    },
    InstallStarted {
        command: String,
        workdir: PathBuf,
    },
    /// Install succeeded but wrote to stderr.
    InstallDiagnostics {
        stderr: String,
    },
    Done {
        name: String,
        dest_dir: PathBuf,
    },
    StageFailed {
        stage: Stage,
        failure: StageFailure,
    },
}

/// Receiver of [`WorkflowEvent`]s.
pub trait EventSink {
    fn emit(&mut self, event: WorkflowEvent);
}

impl EventSink for Vec<WorkflowEvent> {
    fn emit(&mut self, event: WorkflowEvent) {
        self.push(event);
    }
}

pub struct ScaffoldWorkflow<R> {
    settings: WorkflowSettings,
    runner: R,
}

impl<R: CommandRunner> ScaffoldWorkflow<R> {
    pub fn new(settings: WorkflowSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    /// Validate `name` and resolve source and destination against `cwd`.
    ///
    /// `cwd` is expected to be absolute.
    pub fn resolve_request(
        &self,
        name: &str,
        cwd: &Path,
    ) -> Result<ProjectInitRequest, StageFailure> {
        validate_project_name(name).map_err(StageFailure::InvalidRequest)?;
        Ok(ProjectInitRequest {
            name: name.to_string(),
            source_dir: cwd.join(&self.settings.template_dir),
            dest_dir: cwd.join(name),
        })
    }

    /// Run the whole workflow for project `name` under `cwd`.
    ///
    /// Always returns a terminal result; failures are reported in
    /// [`WorkflowResult::state`] and as a final [`WorkflowEvent::StageFailed`].
    #[instrument(skip_all, fields(name = %name))]
    pub fn run(&self, name: &str, cwd: &Path, sink: &mut dyn EventSink) -> WorkflowResult {
        let mut result = WorkflowResult {
            name: name.to_string(),
            dest_dir: None,
            state: WorkflowState::Init,
            completed: Vec::new(),
            copy_report: None,
            tool: None,
            install: None,
        };

        match self.drive(name, cwd, &mut result, sink) {
            Ok(()) => {
                info!("project ready");
                if let Some(dest_dir) = &result.dest_dir {
                    sink.emit(WorkflowEvent::Done {
                        name: name.to_string(),
                        dest_dir: dest_dir.clone(),
                    });
                }
            }
            Err(failure) => {
                let stage = result.state.stage().unwrap_or(Stage::Init);
                warn!(%stage, %failure, "workflow halted");
                sink.emit(WorkflowEvent::StageFailed {
                    stage,
                    failure: failure.clone(),
                });
                let next = result.state.fail(failure);
                transition(&mut result, next);
            }
        }
        result
    }

    fn drive(
        &self,
        name: &str,
        cwd: &Path,
        result: &mut WorkflowResult,
        sink: &mut dyn EventSink,
    ) -> Result<(), StageFailure> {
        let request = self.resolve_request(name, cwd)?;
        result.dest_dir = Some(request.dest_dir.clone());
        sink.emit(WorkflowEvent::Started {
            name: request.name.clone(),
            dest_dir: request.dest_dir.clone(),
        });
        complete_stage(result);

        sink.emit(WorkflowEvent::CopyStarted {
            source: request.source_dir.clone(),
            dest: request.dest_dir.clone(),
        });
        let report = copy_tree(&request.source_dir, &request.dest_dir)?;
        for (path, reason) in report.failures() {
            sink.emit(WorkflowEvent::EntryFailed {
                path: path.clone(),
                reason: reason.to_string(),
            });
        }
        sink.emit(WorkflowEvent::CopyFinished {
            files: report.files_copied(),
            directories: report.directories_created(),
            failed: report.failure_count(),
        });
        result.copy_report = Some(report);
        complete_stage(result);

        let tool = &self.settings.tool;
        let version_request = self.command(
            &tool.version_args,
            &request.dest_dir,
            self.settings.version_timeout,
        );
        let status = check_available(&self.runner, &version_request);
        result.tool = Some(status.clone());
        match status {
            ToolStatus::Available { version } => sink.emit(WorkflowEvent::ToolDetected {
                program: tool.program.clone(),
                version,
            }),
            ToolStatus::Unavailable { reason } => {
                return Err(StageFailure::ToolUnavailable {
                    tool: tool.program.clone(),
                    reason,
                });
            }
        }
        complete_stage(result);

        let install_request = self.command(
            &tool.install_args,
            &request.dest_dir,
            self.settings.install_timeout,
        );
        sink.emit(WorkflowEvent::InstallStarted {
            command: install_request.command_line(),
            workdir: install_request.workdir.clone(),
        });
        let outcome = install(&self.runner, &install_request);
        result.install = Some(outcome.clone());
        match outcome {
            InstallOutcome::Succeeded { stderr, .. } => {
                if !stderr.is_empty() {
                    sink.emit(WorkflowEvent::InstallDiagnostics { stderr });
                }
            }
            InstallOutcome::Failed { reason } => {
                return Err(StageFailure::InstallFailure(reason));
            }
        }
        complete_stage(result);
        Ok(())
    }

    fn command(&self, args: &[String], workdir: &Path, timeout: Duration) -> CommandRequest {
        CommandRequest {
            program: self.settings.tool.program.clone(),
            args: args.to_vec(),
            workdir: workdir.to_path_buf(),
            timeout,
            output_limit_bytes: self.settings.output_limit_bytes,
        }
    }
}

fn complete_stage(result: &mut WorkflowResult) {
    if let Some(stage) = result.state.stage() {
        result.completed.push(stage);
    }
    let next = result.state.advance();
    transition(result, next);
}

fn transition(result: &mut WorkflowResult, next: Result<WorkflowState, TransitionError>) {
    match next {
        Ok(next) => {
            debug!(from = %result.state, to = %next, "workflow transition");
            result.state = next;
        }
        Err(err) => error!(%err, "invalid workflow transition"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCommandRunner, ScriptedRun, TemplateFixture, TreeFile};

    fn fixture() -> TemplateFixture {
        TemplateFixture::new(&[TreeFile::new("package.json", "{}", 0o644)])
    }

    #[test]
    fn resolve_request_joins_name_onto_cwd() {
        let fixture = fixture();
        let workflow = ScaffoldWorkflow::new(
            fixture.settings(),
            ScriptedCommandRunner::new(Vec::new()),
        );

        let request = workflow
            .resolve_request("my-app", &fixture.cwd)
            .expect("resolve");

        assert_eq!(request.dest_dir, fixture.cwd.join("my-app"));
        assert_eq!(request.source_dir, fixture.template);
        assert!(request.source_dir.is_absolute());
    }

    #[test]
    fn relative_template_dir_resolves_against_cwd() {
        let fixture = fixture();
        let mut settings = fixture.settings();
        settings.template_dir = PathBuf::from("templates/api");
        let workflow = ScaffoldWorkflow::new(settings, ScriptedCommandRunner::new(Vec::new()));

        let request = workflow
            .resolve_request("svc", &fixture.cwd)
            .expect("resolve");

        assert_eq!(request.source_dir, fixture.cwd.join("templates/api"));
    }

    /// Verifies an invalid name fails in Init without touching disk or running commands.
    #[test]
    fn invalid_name_fails_init() {
        let fixture = fixture();
        let runner = ScriptedCommandRunner::new(Vec::new());
        let workflow = ScaffoldWorkflow::new(fixture.settings(), runner);
        let mut events = Vec::new();

        let result = workflow.run("../escape", &fixture.cwd, &mut events);

        let (stage, failure) = result.failure().expect("failed");
        assert_eq!(stage, Stage::Init);
        assert!(matches!(failure, StageFailure::InvalidRequest(_)));
        assert_eq!(result.dest_dir, None);
        assert!(result.completed.is_empty());
        assert!(workflow.runner.requests().is_empty());
        assert_eq!(events.len(), 1);
    }

    /// Verifies event order and stage bookkeeping for a fully successful run.
    #[test]
    fn successful_run_emits_events_in_stage_order() {
        let fixture = fixture();
        let runner = ScriptedCommandRunner::new(vec![
            ScriptedRun::exit(0, "10.8.2\n", ""),
            ScriptedRun::exit(0, "added 1 package", "npm WARN deprecated"),
        ]);
        let workflow = ScaffoldWorkflow::new(fixture.settings(), runner);
        let mut events = Vec::new();

        let result = workflow.run("app", &fixture.cwd, &mut events);

        let dest = fixture.cwd.join("app");
        assert!(result.is_done());
        assert_eq!(
            result.completed,
            vec![
                Stage::Init,
                Stage::Copying,
                Stage::ToolCheck,
                Stage::Installing
            ]
        );
        assert_eq!(
            events,
            vec![
                WorkflowEvent::Started {
                    name: "app".to_string(),
                    dest_dir: dest.clone(),
                },
                WorkflowEvent::CopyStarted {
                    source: fixture.template.clone(),
                    dest: dest.clone(),
                },
                WorkflowEvent::CopyFinished {
                    files: 1,
                    directories: 0,
                    failed: 0,
                },
                WorkflowEvent::ToolDetected {
                    program: "npm".to_string(),
                    version: "10.8.2".to_string(),
                },
                WorkflowEvent::InstallStarted {
                    command: "npm install".to_string(),
                    workdir: dest.clone(),
                },
                WorkflowEvent::InstallDiagnostics {
                    stderr: "npm WARN deprecated".to_string(),
                },
                WorkflowEvent::Done {
                    name: "app".to_string(),
                    dest_dir: dest.clone(),
                },
            ]
        );

        let requests = workflow.runner.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|request| request.workdir == dest));
        assert_eq!(requests[0].args, vec!["--version"]);
        assert_eq!(requests[1].args, vec!["install"]);
    }
}
