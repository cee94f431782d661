//! Package tool availability check (`npm --version` by default).

use tracing::{debug, instrument, warn};

use super::process::{CommandRequest, CommandRunner, describe_failure};
use crate::core::types::ToolStatus;

/// Run the tool's version command and report whether the tool is usable.
///
/// Spawn failure, timeout, non-zero exit and empty output all map to
/// `Unavailable`; the reason is meant for the user.
#[instrument(skip_all, fields(command = %request.command_line()))]
pub fn check_available<R: CommandRunner + ?Sized>(
    runner: &R,
    request: &CommandRequest,
) -> ToolStatus {
    let output = match runner.run(request) {
        Ok(output) => output,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "tool could not be started");
            return ToolStatus::Unavailable {
                reason: format!("{err:#}"),
            };
        }
    };

    if !output.success {
        let reason = describe_failure(request, &output);
        warn!(%reason, "tool version check failed");
        return ToolStatus::Unavailable { reason };
    }

    let version = output.stdout_text().trim().to_string();
    if version.is_empty() {
        return ToolStatus::Unavailable {
            reason: format!("`{}` printed no version", request.command_line()),
        };
    }

    debug!(%version, "tool available");
    ToolStatus::Available { version }
}
