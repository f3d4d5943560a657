//! Checker adapter that shells out to the project's build.
//!
//! The build command receives its inputs through the environment:
//! `NULLSWEEP_MODULES` (comma separated), `NULLSWEEP_OUTPUT_DIR` and
//! `NULLSWEEP_ASSUMPTIONS` (a JSON array of locations to treat as nullable).
//! It must write `<output_dir>/<module>/diagnostics.json` for every module
//! that has diagnostics. Every build gets its own scratch directory under the
//! configured output directory, so concurrent builds never share files.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, Diagnostic};
use crate::domain::ports::{BuildRequest, BuildResult, Checker};

const DIAGNOSTICS_FILE: &str = "diagnostics.json";
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct CommandChecker {
    build_command: String,
    output_dir: PathBuf,
}

impl CommandChecker {
    pub fn new(build_command: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_command: build_command.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.checker.build_command.clone(),
            config
                .checker
                .output_dir
                .clone()
                .unwrap_or_else(|| config.output_dir.join("diagnostics")),
        )
    }

    fn scratch_dir(&self) -> PathBuf {
        self.output_dir.join(format!("build-{}", Uuid::new_v4()))
    }
}

#[async_trait]
impl Checker for CommandChecker {
    async fn build(&self, request: &BuildRequest) -> DomainResult<BuildResult> {
        if self.build_command.trim().is_empty() {
            return Err(DomainError::build_failed(&request.modules, "no build command configured"));
        }

        let scratch = self.scratch_dir();
        fs::create_dir_all(&scratch).await?;
        let result = run_in(&self.build_command, &scratch, request).await;
        if let Err(e) = fs::remove_dir_all(&scratch).await {
            warn!(dir = %scratch.display(), error = %e, "failed to clean build scratch directory");
        }
        result
    }
}

async fn run_in(build_command: &str, scratch: &Path, request: &BuildRequest) -> DomainResult<BuildResult> {
    let assumptions = scratch.join("assumptions.json");
    fs::write(&assumptions, serde_json::to_vec_pretty(&request.assume_nullable)?).await?;

    debug!(
        modules = ?request.modules,
        assumed = request.assume_nullable.len(),
        dir = %scratch.display(),
        "running build"
    );
    let output = Command::new("sh")
        .arg("-c")
        .arg(build_command)
        .env("NULLSWEEP_MODULES", request.modules.join(","))
        .env("NULLSWEEP_OUTPUT_DIR", scratch)
        .env("NULLSWEEP_ASSUMPTIONS", &assumptions)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DomainError::build_failed(&request.modules, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        return Err(DomainError::build_failed(
            &request.modules,
            format!("build exited with {}: {tail}", output.status),
        ));
    }

    let mut outputs = BTreeMap::new();
    for module in &request.modules {
        let diagnostics: Vec<Diagnostic> = match fs::read(scratch.join(module).join(DIAGNOSTICS_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        outputs.insert(module.clone(), diagnostics);
    }

    Ok(BuildResult { outputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeclLocation;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_reads_diagnostics_per_module() {
        let dir = tempfile::tempdir().unwrap();
        let command = r#"mkdir -p "$NULLSWEEP_OUTPUT_DIR/core" && printf '%s' '[{"kind":"DEREFERENCE","message":"m","region":{"class":"a.B","member":"run()"}}]' > "$NULLSWEEP_OUTPUT_DIR/core/diagnostics.json""#;
        let checker = CommandChecker::new(command, dir.path());

        let result = checker
            .build(&BuildRequest {
                modules: vec!["core".to_string(), "app".to_string()],
                assume_nullable: BTreeSet::new(),
            })
            .await
            .unwrap();

        assert_eq!(result.diagnostics("core").len(), 1);
        assert_eq!(result.diagnostics("core")[0].region.member.as_deref(), Some("run()"));
        assert!(result.diagnostics("app").is_empty());
    }

    #[tokio::test]
    async fn test_passes_assumptions_file() {
        let dir = tempfile::tempdir().unwrap();
        let command = r#"mkdir -p "$NULLSWEEP_OUTPUT_DIR/core" && grep -q 'find()' "$NULLSWEEP_ASSUMPTIONS""#;
        let checker = CommandChecker::new(command, dir.path());
        let request = BuildRequest::module("core")
            .assuming(BTreeSet::from([DeclLocation::method("a.Repo", "find()")]));

        assert!(checker.build(&request).await.is_ok());
        assert!(checker.build(&BuildRequest::module("core")).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_builds_keep_their_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let command = r#"sleep 0.3; mkdir -p "$NULLSWEEP_OUTPUT_DIR/dep"; if grep -q 'fetch()' "$NULLSWEEP_ASSUMPTIONS"; then printf '%s' '[{"kind":"DEREFERENCE_NULLABLE","message":"m","region":{"class":"dep.Client","member":"run()"}}]' > "$NULLSWEEP_OUTPUT_DIR/dep/diagnostics.json"; fi"#;
        let checker = CommandChecker::new(command, dir.path());
        let plain = BuildRequest::module("dep");
        let assumed = BuildRequest::module("dep")
            .assuming(BTreeSet::from([DeclLocation::method("a.Repo", "fetch()")]));

        let (plain, assumed) = tokio::join!(checker.build(&plain), checker.build(&assumed));

        assert!(plain.unwrap().diagnostics("dep").is_empty());
        assert_eq!(assumed.unwrap().diagnostics("dep").len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failing_build_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let checker = CommandChecker::new("echo 'compilation error' >&2; exit 3", dir.path());

        match checker.build(&BuildRequest::module("core")).await {
            Err(DomainError::BuildFailed { modules, reason }) => {
                assert_eq!(modules, "core");
                assert!(reason.contains("compilation error"));
            }
            other => panic!("expected build failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let checker = CommandChecker::new("  ", dir.path());
        assert!(checker.build(&BuildRequest::module("core")).await.is_err());
    }
}
