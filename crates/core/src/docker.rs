//! Docker CLI command builders.
//!
//! Thin typed wrappers over `docker ps`, `docker compose up`, `docker cp`
//! and `docker exec`. Every call goes through a [`CommandRunner`], and a
//! non-zero exit status is always surfaced as
//! [`DockerError::CommandFailed`] rather than ignored.

use std::path::Path;

use crate::process::{CommandOutput, CommandRunner, ProcessError};

/// Docker CLI binary name.
const DOCKER_BIN: &str = "docker";

/// Host `psql` connects to inside the database container. TCP only
/// answers once the final server listens; the init-time server started
/// by the postgres entrypoint accepts socket connections only.
const PSQL_HOST: &str = "127.0.0.1";

/// Error type for Docker operations.
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("`{command}` failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("failed to parse command output: {0}")]
    Parse(String),
}

/// Docker CLI client over an arbitrary [`CommandRunner`].
#[derive(Debug, Clone)]
pub struct Docker<R> {
    runner: R,
}

impl<R: CommandRunner> Docker<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// True when a container named exactly `name` is running.
    pub async fn is_container_running(&self, name: &str) -> Result<bool, DockerError> {
        let output = self
            .checked(vec![
                "ps".into(),
                "--filter".into(),
                format!("name=^{name}$"),
                "--format".into(),
                "{{.Names}}".into(),
            ])
            .await?;
        Ok(output.stdout.lines().any(|line| line.trim() == name))
    }

    /// `docker compose -f <file> up -d`.
    pub async fn compose_up(&self, compose_file: &Path) -> Result<CommandOutput, DockerError> {
        self.checked(vec![
            "compose".into(),
            "-f".into(),
            compose_file.display().to_string(),
            "up".into(),
            "-d".into(),
        ])
        .await
    }

    /// `docker cp <src> <container>:<dest>`.
    pub async fn copy_into(
        &self,
        container: &str,
        src: &Path,
        dest: &str,
    ) -> Result<CommandOutput, DockerError> {
        self.checked(vec![
            "cp".into(),
            src.display().to_string(),
            format!("{container}:{dest}"),
        ])
        .await
    }

    /// `docker exec <container> <args...>`, failing on non-zero exit.
    pub async fn exec(&self, container: &str, args: &[String]) -> Result<CommandOutput, DockerError> {
        self.checked(exec_args(container, args)).await
    }

    /// `docker exec <container> <args...>`, returning the output whatever
    /// the exit status. Used for best-effort steps.
    pub async fn exec_unchecked(
        &self,
        container: &str,
        args: &[String],
    ) -> Result<CommandOutput, DockerError> {
        Ok(self.runner.run(DOCKER_BIN, &exec_args(container, args)).await?)
    }

    /// Run a single SQL statement through `psql` inside `container` over
    /// loopback TCP, tuples-only output.
    pub async fn psql(
        &self,
        container: &str,
        user: &str,
        dbname: &str,
        sql: &str,
    ) -> Result<CommandOutput, DockerError> {
        self.exec(
            container,
            &[
                "psql".into(),
                "-h".into(),
                PSQL_HOST.into(),
                "-U".into(),
                user.into(),
                "-d".into(),
                dbname.into(),
                "-t".into(),
                "-c".into(),
                sql.into(),
            ],
        )
        .await
    }

    async fn checked(&self, args: Vec<String>) -> Result<CommandOutput, DockerError> {
        let output = self.runner.run(DOCKER_BIN, &args).await?;
        if !output.success() {
            return Err(DockerError::CommandFailed {
                command: format!("{DOCKER_BIN} {}", args.first().map(String::as_str).unwrap_or("")),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn exec_args(container: &str, args: &[String]) -> Vec<String> {
    let mut full = Vec::with_capacity(args.len() + 2);
    full.push("exec".to_string());
    full.push(container.to_string());
    full.extend(args.iter().cloned());
    full
}

/// Parse the scalar printed by `psql -t -c "SELECT COUNT(*) ..."`.
///
/// Surrounding whitespace and blank lines are ignored; the first
/// non-empty line must be an integer.
pub fn parse_scalar_count(stdout: &str) -> Result<i64, DockerError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| DockerError::Parse("empty output".to_string()))?;
    line.parse::<i64>()
        .map_err(|e| DockerError::Parse(format!("'{line}' is not a count: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
