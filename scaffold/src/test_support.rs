//! Test-only helpers: scripted command runners and template tree builders.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::io::config::ToolConfig;
use crate::io::entry;
use crate::io::process::{CommandOutput, CommandRequest, CommandRunner};
use crate::workflow::WorkflowSettings;

/// One canned response for [`ScriptedCommandRunner`].
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    Output(CommandOutput),
    /// The command could not be started.
    SpawnError(String),
}

impl ScriptedRun {
    /// Process ran to completion with `code`.
    pub fn exit(code: i32, stdout: &str, stderr: &str) -> Self {
        ScriptedRun::Output(CommandOutput {
            exit_code: Some(code),
            success: code == 0,
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: false,
        })
    }

    /// Process was killed after exceeding its timeout.
    pub fn timeout() -> Self {
        ScriptedRun::Output(CommandOutput {
            exit_code: None,
            success: false,
            stdout: Vec::new(),
            stderr: Vec::new(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: true,
        })
    }

    pub fn spawn_error(message: &str) -> Self {
        ScriptedRun::SpawnError(message.to_string())
    }
}

/// [`CommandRunner`] that replays scripted responses in order and records requests.
///
/// Running out of responses is an error, so tests notice unexpected invocations.
pub struct ScriptedCommandRunner {
    runs: RefCell<VecDeque<ScriptedRun>>,
    requests: RefCell<Vec<CommandRequest>>,
}

impl ScriptedCommandRunner {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.borrow().clone()
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        self.requests.borrow_mut().push(request.clone());
        match self.runs.borrow_mut().pop_front() {
            Some(ScriptedRun::Output(output)) => Ok(output),
            Some(ScriptedRun::SpawnError(message)) => Err(anyhow!(message)),
            None => Err(anyhow!(
                "no scripted response for `{}`",
                request.command_line()
            )),
        }
    }
}

/// A file to place in a test template tree.
#[derive(Debug, Clone)]
pub struct TreeFile {
    /// `/`-separated path relative to the tree root.
    pub path: &'static str,
    pub contents: &'static str,
    pub mode: u32,
}

impl TreeFile {
    pub fn new(path: &'static str, contents: &'static str, mode: u32) -> Self {
        Self {
            path,
            contents,
            mode,
        }
    }
}

/// Create `files` under `root`, creating parent directories as needed.
///
/// Panics on I/O errors; intended for test setup only.
pub fn write_tree(root: &Path, files: &[TreeFile]) {
    fs::create_dir_all(root).expect("create tree root");
    for file in files {
        let path = root.join(file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create tree dir");
        }
        fs::write(&path, file.contents).expect("write tree file");
        entry::set_mode(&path, file.mode).expect("set tree file mode");
    }
}

/// Permission bits of `path` as reported by [`entry::inspect`].
pub fn read_mode(path: &Path) -> u32 {
    entry::inspect(path)
        .expect("inspect")
        .expect("path exists")
        .mode
}

/// Temporary template plus an empty working directory to scaffold into.
///
/// Layout: `<temp>/template` (populated from the given files) and `<temp>/work`.
pub struct TemplateFixture {
    _temp: TempDir,
    pub template: PathBuf,
    pub cwd: PathBuf,
}

impl TemplateFixture {
    pub fn new(files: &[TreeFile]) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let template = temp.path().join("template");
        let cwd = temp.path().join("work");
        write_tree(&template, files);
        fs::create_dir_all(&cwd).expect("create work dir");
        Self {
            _temp: temp,
            template,
            cwd,
        }
    }

    /// Settings pointing at this fixture's template, using `npm` with short timeouts.
    pub fn settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            template_dir: self.template.clone(),
            tool: ToolConfig {
                program: "npm".to_string(),
                ..ToolConfig::default()
            },
            version_timeout: Duration::from_secs(5),
            install_timeout: Duration::from_secs(5),
            output_limit_bytes: 64 * 1024,
        }
    }
}
