//! Dependency install step (`npm install` by default).

use tracing::{info, instrument, warn};

use super::process::{CommandRequest, CommandRunner, describe_failure};
use crate::core::types::InstallOutcome;

/// Run the install command in the project directory.
///
/// Only the exit status decides failure. Output on stderr with a zero exit is
/// kept in `Succeeded::stderr` so it can be shown as a warning.
#[instrument(skip_all, fields(command = %request.command_line(), workdir = %request.workdir.display()))]
pub fn install<R: CommandRunner + ?Sized>(runner: &R, request: &CommandRequest) -> InstallOutcome {
    let output = match runner.run(request) {
        Ok(output) => output,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "install could not be started");
            return InstallOutcome::Failed {
                reason: format!("{err:#}"),
            };
        }
    };

    if !output.success {
        let reason = describe_failure(request, &output);
        warn!(%reason, "install failed");
        return InstallOutcome::Failed { reason };
    }

    let stderr = output.stderr_text().trim().to_string();
    if !stderr.is_empty() {
        warn!(bytes = stderr.len(), "install succeeded with diagnostics on stderr");
    }
    info!("dependencies installed");
    InstallOutcome::Succeeded {
        stdout: output.stdout_text().trim().to_string(),
        stderr,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::test_support::{ScriptedCommandRunner, ScriptedRun};

    fn install_request() -> CommandRequest {
        CommandRequest {
            program: "npm".to_string(),
            args: vec!["install".to_string()],
            workdir: PathBuf::from("/work/app"),
            timeout: Duration::from_secs(600),
            output_limit_bytes: 1024,
        }
    }

    #[test]
    fn succeeds_on_zero_exit() {
        let runner =
            ScriptedCommandRunner::new(vec![ScriptedRun::exit(0, "added 42 packages\n", "")]);

        let outcome = install(&runner, &install_request());

        assert_eq!(
            outcome,
            InstallOutcome::Succeeded {
                stdout: "added 42 packages".to_string(),
                stderr: String::new(),
            }
        );
        assert_eq!(runner.requests()[0].workdir, PathBuf::from("/work/app"));
    }

    /// Verifies stderr diagnostics with a zero exit are a warning, not a failure.
    #[test]
    fn stderr_with_zero_exit_still_succeeds() {
        let runner = ScriptedCommandRunner::new(vec![ScriptedRun::exit(
            0,
            "added 42 packages",
            "npm WARN deprecated inflight@1.0.6",
        )]);

        let outcome = install(&runner, &install_request());

        assert_eq!(
            outcome,
            InstallOutcome::Succeeded {
                stdout: "added 42 packages".to_string(),
                stderr: "npm WARN deprecated inflight@1.0.6".to_string(),
            }
        );
    }

    /// Verifies a non-zero exit fails even when stdout reports partial success.
    #[test]
    fn non_zero_exit_fails_despite_success_text() {
        let runner = ScriptedCommandRunner::new(vec![ScriptedRun::exit(
            1,
            "added 41 packages",
            "npm ERR! code ERESOLVE",
        )]);

        let outcome = install(&runner, &install_request());

        assert_eq!(
            outcome,
            InstallOutcome::Failed {
                reason: "`npm install` exited with status 1: npm ERR! code ERESOLVE".to_string()
            }
        );
    }

    #[test]
    fn spawn_error_fails() {
        let runner = ScriptedCommandRunner::new(vec![ScriptedRun::spawn_error("permission denied")]);

        let outcome = install(&runner, &install_request());

        assert!(!outcome.is_success());
    }

    #[test]
    fn timeout_fails() {
        let runner = ScriptedCommandRunner::new(vec![ScriptedRun::timeout()]);

        match install(&runner, &install_request()) {
            InstallOutcome::Failed { reason } => assert!(reason.contains("timed out after 600s")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
