//! Dialogs backed by an external helper program.
//!
//! The helper is the UI surface: its exit status is the user's decision and
//! its standard output carries the selection. Closing the dialog kills it.

use std::process::{ExitStatus, Stdio};

use async_process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::CommandConfig;
use crate::dialog::{Dialog, OutcomeSender};
use crate::request::{ResponseCode, Results};

/// Builds the response payload from the outcome and the helper's output.
pub type ResultsMapper = Box<dyn FnOnce(ResponseCode, &str) -> Results + Send>;

/// Maps a helper's exit status to a response code.
///
/// `0` is acceptance, `1` is an explicit cancel, anything else (other codes,
/// death by signal) counts as dismissed.
pub fn response_code(status: ExitStatus) -> ResponseCode {
    match status.code() {
        Some(0) => ResponseCode::Success,
        Some(1) => ResponseCode::Cancelled,
        _ => ResponseCode::Other,
    }
}

pub struct CommandDialog {
    command: CommandConfig,
    map_results: Option<ResultsMapper>,
    task: Option<JoinHandle<()>>,
}

impl CommandDialog {
    pub fn new<F>(command: CommandConfig, map_results: F) -> Self
    where
        F: FnOnce(ResponseCode, &str) -> Results + Send + 'static,
    {
        Self {
            command,
            map_results: Some(Box::new(map_results)),
            task: None,
        }
    }
}

impl Dialog for CommandDialog {
    fn present(&mut self, outcome: OutcomeSender) {
        let Some(map_results) = self.map_results.take() else {
            error!(program = %self.command.program, "Dialog presented twice");
            return;
        };

        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) => {
                error!(program = %self.command.program, %err, "Failed to spawn dialog helper");
                outcome.send(ResponseCode::Other, map_results(ResponseCode::Other, ""));
                return;
            }
        };

        let program = self.command.program.clone();
        debug!(dialog = %outcome.id(), %program, args = ?self.command.args, "Dialog helper started");

        self.task = Some(tokio::spawn(async move {
            match child.output().await {
                Ok(output) => {
                    let code = response_code(output.status);
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    debug!(dialog = %outcome.id(), %program, status = %output.status, "Dialog helper exited");
                    let results = map_results(code, stdout.trim_end());
                    outcome.send(code, results);
                }
                Err(err) => {
                    warn!(dialog = %outcome.id(), %program, %err, "Failed to wait for dialog helper");
                    outcome.send(ResponseCode::Other, map_results(ResponseCode::Other, ""));
                }
            }
        }));
    }

    fn close(self: Box<Self>) {
        // dropping the output future drops the child, which kills it
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn exit_status_maps_to_response_code() {
        assert_eq!(response_code(ExitStatus::from_raw(0)), ResponseCode::Success);
        assert_eq!(response_code(ExitStatus::from_raw(1 << 8)), ResponseCode::Cancelled);
        assert_eq!(response_code(ExitStatus::from_raw(5 << 8)), ResponseCode::Other);
    }

    #[test]
    fn killed_helper_counts_as_dismissed() {
        // raw wait status 9: terminated by SIGKILL
        assert_eq!(response_code(ExitStatus::from_raw(9)), ResponseCode::Other);
    }
}
