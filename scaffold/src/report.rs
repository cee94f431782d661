//! Plain-text console rendering of workflow events.

use crate::core::types::StageFailure;
use crate::io::config::ToolConfig;
use crate::workflow::{EventSink, WorkflowEvent};

/// A rendered line and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Stdout(String),
    Stderr(String),
}

/// Render one event as console lines.
///
/// `tool` supplies the command shown in the next steps once the project is ready.
pub fn render_event(event: &WorkflowEvent, tool: &ToolConfig) -> Vec<Line> {
    match event {
        WorkflowEvent::Started { name, dest_dir } => vec![Line::Stdout(format!(
            "Initializing project \"{name}\" in {}",
            dest_dir.display()
        ))],
        WorkflowEvent::CopyStarted { source, .. } => vec![Line::Stdout(format!(
            "Copying project files from {}...",
            source.display()
        ))],
        WorkflowEvent::EntryFailed { path, reason } => vec![Line::Stderr(format!(
            "error: could not copy {}: {reason}",
            path.display()
        ))],
        WorkflowEvent::CopyFinished {
            files,
            directories,
            failed,
        } => {
            let mut lines = vec![Line::Stdout(format!(
                "Project template created ({files} files, {directories} directories)."
            ))];
            if *failed > 0 {
                lines.push(Line::Stderr(format!(
                    "warning: {failed} entries could not be copied"
                )));
            }
            lines
        }
        WorkflowEvent::ToolDetected { program, version } => {
            vec![Line::Stdout(format!("{program} detected (version {version})."))]
        }
        WorkflowEvent::InstallStarted { command, .. } => {
            vec![Line::Stdout(format!("Installing dependencies ({command})..."))]
        }
        WorkflowEvent::InstallDiagnostics { stderr } => {
            let mut lines = vec![Line::Stderr(
                "warning: the installer reported diagnostics:".to_string(),
            )];
            lines.extend(stderr.lines().map(|line| Line::Stderr(format!("  {line}"))));
            lines
        }
        WorkflowEvent::Done { name, .. } => {
            let mut run_command = tool.program.clone();
            for arg in &tool.run_args {
                run_command.push(' ');
                run_command.push_str(arg);
            }
            vec![
                Line::Stdout("Dependencies installed successfully.".to_string()),
                Line::Stdout(String::new()),
                Line::Stdout(format!("Project \"{name}\" is ready!")),
                Line::Stdout(String::new()),
                Line::Stdout("Next steps:".to_string()),
                Line::Stdout(format!("  $ cd {name}")),
                Line::Stdout(format!("  $ {run_command}")),
                Line::Stdout(String::new()),
                Line::Stdout("Happy coding!".to_string()),
            ]
        }
        WorkflowEvent::StageFailed { stage, failure } => {
            let mut lines = vec![Line::Stderr(format!("error: {stage} failed: {failure}"))];
            if let StageFailure::ToolUnavailable { tool, .. } = failure {
                lines.push(Line::Stderr(format!(
                    "{tool} is required to install dependencies. Please install it first."
                )));
            }
            lines
        }
    }
}

/// [`EventSink`] that prints to stdout/stderr as events arrive.
pub struct ConsoleReporter {
    tool: ToolConfig,
}

impl ConsoleReporter {
    pub fn new(tool: &ToolConfig) -> Self {
        Self { tool: tool.clone() }
    }
}

impl EventSink for ConsoleReporter {
    fn emit(&mut self, event: WorkflowEvent) {
        for line in render_event(&event, &self.tool) {
            match line {
                Line::Stdout(text) => println!("{text}"),
                Line::Stderr(text) => eprintln!("{text}"),
            }
        }
    }
}
