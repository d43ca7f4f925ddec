//! Publishing to version control
//!
//! Stages the generated feed and its dashboard page, commits with a
//! timestamped message and pushes. Having nothing staged skips the commit;
//! any failing git step is an error. The feed on disk is never touched here.

use crate::error::ReportError;
use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::info;

/// Prefix of every data-update commit message
pub const COMMIT_PREFIX: &str = "Оновлення даних";

/// Commit message for an update made at `at`
pub fn commit_message<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{COMMIT_PREFIX}: {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// What a publish run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub message: String,
    pub committed: bool,
    pub pushed: bool,
}

/// Git publisher for the dashboard files
pub struct GitPublisher {
    repo_dir: PathBuf,
    files: Vec<PathBuf>,
    push: bool,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            files,
            push: true,
        }
    }

    /// Commit locally without pushing
    pub fn without_push(mut self) -> Self {
        self.push = false;
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Stage, commit and push, using the current local time for the message
    pub fn publish(&self) -> Result<PublishSummary, ReportError> {
        self.publish_with_message(commit_message(&Local::now()))
    }

    pub fn publish_with_message(&self, message: String) -> Result<PublishSummary, ReportError> {
        let mut add = vec!["add".to_string()];
        add.extend(self.files.iter().map(|f| f.to_string_lossy().into_owned()));
        self.git("add", &add)?;

        let committed = self.has_staged_changes()?;
        if committed {
            let commit = ["commit".to_string(), "-m".to_string(), message.clone()];
            self.git("commit", &commit)?;
        } else {
            info!("no changes staged, skipping commit");
        }

        let pushed = if self.push {
            self.git("push", &["push".to_string()])?;
            true
        } else {
            false
        };

        info!(committed, pushed, message = %message, "published");
        Ok(PublishSummary {
            message,
            committed,
            pushed,
        })
    }

    /// `git diff --cached --quiet` exits 1 when the index differs from HEAD
    fn has_staged_changes(&self) -> Result<bool, ReportError> {
        let args = ["diff", "--cached", "--quiet"].map(String::from);
        let output = self.run("diff", &args)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure("diff", &output)),
        }
    }

    fn git(&self, step: &str, args: &[String]) -> Result<(), ReportError> {
        let output = self.run(step, args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failure(step, &output))
        }
    }

    fn run(&self, step: &str, args: &[String]) -> Result<Output, ReportError> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| ReportError::Publish {
                step: step.to_string(),
                message: e.to_string(),
            })
    }
}

fn failure(step: &str, output: &Output) -> ReportError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    ReportError::Publish {
        step: step.to_string(),
        message: if stderr.is_empty() { stdout } else { stderr },
    }
}
