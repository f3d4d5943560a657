//! Injector adapter that hands change batches to an external rewriting tool.
//!
//! The tool is run with `NULLSWEEP_INJECTION_ACTION` (`apply` or `remove`)
//! and `NULLSWEEP_INJECTION_FILE` (a JSON array of changes). It may print
//! `{"failed": [...]}` on stdout to report changes it could not write.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Change, Config};
use crate::domain::ports::{InjectionOutcome, Injector};

#[derive(Debug, Clone)]
pub struct CommandInjector {
    command: String,
    work_dir: PathBuf,
}

impl CommandInjector {
    pub fn new(command: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.injector.command.clone(), config.output_dir.join("injections"))
    }

    async fn run(&self, action: &str, changes: &[Change]) -> DomainResult<InjectionOutcome> {
        if changes.is_empty() {
            return Ok(InjectionOutcome::default());
        }
        if self.command.trim().is_empty() {
            return Err(DomainError::InjectionFailed(
                "no injector command configured".to_string(),
            ));
        }

        fs::create_dir_all(&self.work_dir).await?;
        let batch = self.work_dir.join(format!("{action}-{}.json", Uuid::new_v4()));
        fs::write(&batch, serde_json::to_vec_pretty(changes)?).await?;

        debug!(action, changes = changes.len(), "running injector");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("NULLSWEEP_INJECTION_ACTION", action)
            .env("NULLSWEEP_INJECTION_FILE", &batch)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DomainError::InjectionFailed(e.to_string()));

        if let Err(e) = fs::remove_file(&batch).await {
            warn!(path = %batch.display(), error = %e, "could not remove injection batch file");
        }
        let output = output?;

        if !output.status.success() {
            return Err(DomainError::InjectionFailed(format!(
                "injector exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            Ok(InjectionOutcome::default())
        } else {
            Ok(serde_json::from_str(stdout)?)
        }
    }
}

#[async_trait]
impl Injector for CommandInjector {
    async fn apply(&self, changes: &[Change]) -> DomainResult<InjectionOutcome> {
        self.run("apply", changes).await
    }

    async fn remove(&self, changes: &[Change]) -> DomainResult<InjectionOutcome> {
        self.run("remove", changes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeclLocation;

    fn change() -> Change {
        Change::marker(DeclLocation::field("a.B", "f"), "javax.annotation.Nullable")
    }

    #[tokio::test]
    async fn test_batch_file_and_action_are_passed() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let command = format!(
            r#"echo "$NULLSWEEP_INJECTION_ACTION" >> "{}" && grep -q 'Nullable' "$NULLSWEEP_INJECTION_FILE""#,
            log.display()
        );
        let injector = CommandInjector::new(command, dir.path().join("work"));

        assert!(injector.apply(&[change()]).await.unwrap().succeeded());
        assert!(injector.remove(&[change()]).await.unwrap().succeeded());

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["apply", "remove"]);
    }

    #[tokio::test]
    async fn test_failed_changes_reported_on_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let failed = serde_json::json!({ "failed": [change()] }).to_string();
        let injector = CommandInjector::new(format!("printf '%s' '{failed}'"), dir.path());

        let outcome = injector.apply(&[change()]).await.unwrap();
        assert_eq!(outcome.failed, vec![change()]);
        assert!(outcome.applied(&[change()]).is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_command() {
        let injector = CommandInjector::new("exit 1", "/nonexistent");
        assert!(injector.apply(&[]).await.unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let injector = CommandInjector::new("exit 2", dir.path());
        assert!(matches!(
            injector.apply(&[change()]).await,
            Err(DomainError::InjectionFailed(_))
        ));
    }
}
