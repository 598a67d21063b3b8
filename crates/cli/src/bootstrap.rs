//! Bringing up the container environment.

use aphrc_core::config::EnvironmentConfig;
use aphrc_core::docker::Docker;
use aphrc_core::process::CommandRunner;
use aphrc_core::readiness::{poll_until_ready, ReadinessConfig};

use crate::error::WorkflowResult;

/// The docker client plus the names it operates on.
pub struct Environment<R> {
    pub docker: Docker<R>,
    pub config: EnvironmentConfig,
    /// Backoff used while waiting for the database.
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// True when `docker compose up` was issued.
    pub started: bool,
    /// Readiness probes made before the database answered.
    pub probe_attempts: u32,
}

impl<R: CommandRunner> Environment<R> {
    pub fn new(docker: Docker<R>, config: EnvironmentConfig) -> Self {
        let readiness = ReadinessConfig::with_timeout(config.readiness_timeout);
        Self {
            docker,
            config,
            readiness,
        }
    }

    /// Start the compose stack unless both containers already run, then
    /// wait until the database accepts queries.
    pub async fn ensure_running(&self) -> WorkflowResult<BootstrapOutcome> {
        let db_running = self.docker.is_container_running(&self.config.db_container).await?;
        let runner_running = self
            .docker
            .is_container_running(&self.config.runner_container)
            .await?;

        let started = !(db_running && runner_running);
        if started {
            tracing::info!(
                compose_file = %self.config.compose_file.display(),
                db_running,
                runner_running,
                "Starting containers",
            );
            self.docker.compose_up(&self.config.compose_file).await?;
        } else {
            tracing::info!("Containers already running");
        }

        let probe_attempts = self.wait_for_database().await?;
        Ok(BootstrapOutcome {
            started,
            probe_attempts,
        })
    }

    /// Poll `SELECT 1` inside the database container with backoff.
    pub async fn wait_for_database(&self) -> WorkflowResult<u32> {
        let attempts = poll_until_ready(&self.config.db_container, &self.readiness, || async {
            self.docker
                .psql(
                    &self.config.db_container,
                    &self.config.db_service_user,
                    &self.config.db_service_name,
                    "SELECT 1",
                )
                .await
                .map(|_| ())
        })
        .await?;
        Ok(attempts)
    }
}
