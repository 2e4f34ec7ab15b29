// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runner for the feed daemon's command-line client.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use pubreward_config::model::FeedConfig;

/// Why an invocation failed.
#[derive(Debug)]
pub(crate) enum CliFailure {
    Spawn(std::io::Error),
    TimedOut(Duration),
    Exit { code: Option<i32>, stderr: String },
}

impl std::fmt::Display for CliFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to spawn: {e}"),
            Self::TimedOut(d) => write!(f, "timed out after {d:?}"),
            Self::Exit { code, stderr } => {
                write!(f, "exited with {code:?}: {}", stderr.trim())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SbotCli {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl SbotCli {
    pub(crate) fn from_config(config: &FeedConfig) -> Self {
        Self {
            program: config.sbotcli_path.clone(),
            extra_args: config.extra_args.clone(),
            timeout: config.fetch_timeout(),
        }
    }

    pub(crate) fn program(&self) -> &str {
        &self.program
    }

    /// Runs `program [extra_args] args...` and returns its stdout.
    pub(crate) async fn run(&self, args: &[String]) -> Result<Vec<u8>, CliFailure> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, ?args, "invoking feed client");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| CliFailure::TimedOut(self.timeout))?
            .map_err(CliFailure::Spawn)?;

        if !output.status.success() {
            return Err(CliFailure::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }
}
