use std::fs::{self, File};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ExitPolicy, RunnerConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Exited { code: i32 },
    Signaled,
    NotStarted { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: JobStatus,
    pub exit_code: i32,
}

impl RunOutcome {
    pub fn job_succeeded(&self) -> bool {
        matches!(self.status, JobStatus::Exited { code: 0 })
    }
}

impl ExitPolicy {
    pub fn exit_code(self, status: &JobStatus) -> i32 {
        match (self, status) {
            (ExitPolicy::AlwaysSucceed, _) => 0,
            (ExitPolicy::Propagate, JobStatus::Exited { code }) => *code,
            (ExitPolicy::Propagate, _) => 1,
        }
    }
}

pub struct PlaybookRunner {
    config: RunnerConfig,
}

impl PlaybookRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Runs the playbook with both output streams redirected into the log
    /// files. Errors are returned only when the log files themselves cannot
    /// be created.
    pub fn run(&self) -> Result<RunOutcome> {
        let config = &self.config;
        let stdout_log = File::create(&config.stdout_log).with_context(|| {
            format!("failed to create {}", config.stdout_log.display())
        })?;
        let stderr_log = File::create(&config.stderr_log).with_context(|| {
            format!("failed to create {}", config.stderr_log.display())
        })?;

        let spawned = Command::new(&config.program)
            .args(&config.args)
            .arg(&config.playbook)
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .status();

        let status = match spawned {
            Ok(status) => match status.code() {
                Some(code) => JobStatus::Exited { code },
                None => JobStatus::Signaled,
            },
            Err(err) => {
                let error = format!(
                    "{}: cannot run in {}: {err}",
                    config.program,
                    config.working_dir.display()
                );
                fs::write(&config.stderr_log, format!("{error}\n")).with_context(|| {
                    format!("failed to write {}", config.stderr_log.display())
                })?;
                JobStatus::NotStarted { error }
            }
        };

        let outcome = RunOutcome {
            exit_code: config.exit_policy.exit_code(&status),
            status,
        };
        if outcome.job_succeeded() {
            info!(playbook = %config.playbook, "playbook finished");
        } else {
            warn!(
                playbook = %config.playbook,
                status = ?outcome.status,
                stderr_log = %config.stderr_log.display(),
                "playbook did not succeed"
            );
        }
        Ok(outcome)
    }

    /// Runs the playbook and returns the process exit code chosen by the
    /// exit policy, including when the log files cannot be opened.
    pub fn run_for_exit(&self) -> i32 {
        match self.run() {
            Ok(outcome) => outcome.exit_code,
            Err(err) => {
                let error = format!("{err:#}");
                warn!(error = %error, "playbook run failed");
                self.config
                    .exit_policy
                    .exit_code(&JobStatus::NotStarted { error })
            }
        }
    }
}
