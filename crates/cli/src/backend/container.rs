//! Backend that drives the external Python scripts inside the runner
//! container.

use std::path::PathBuf;

use aphrc_core::config::{RemoteDbConfig, WORKS_TABLE};
use aphrc_core::docker::parse_scalar_count;
use aphrc_core::process::{CommandOutput, CommandRunner};
use aphrc_db::repositories::work_repo::CREATE_TABLE_SQL;

use super::{ExportSummary, ExtractSummary, WorksBackend};
use crate::bootstrap::Environment;
use crate::error::{WorkflowError, WorkflowResult};

pub const EXTRACT_SCRIPT: &str = "extract_aphrc_from_snapshot.py";
pub const VERIFY_SCRIPT: &str = "verify_aphrc.py";
pub const EXPORT_SCRIPT: &str = "export_to_remote.py";

/// Packages the extraction and export scripts import.
const EXTRACTION_PACKAGES: &[&str] = &["requests", "psycopg2-binary", "pandas", "boto3"];

/// Package the verification script uses for table output.
const REPORT_PACKAGES: &[&str] = &["tabulate"];

pub struct ContainerBackend<'a, R> {
    env: &'a Environment<R>,
}

impl<'a, R: CommandRunner> ContainerBackend<'a, R> {
    pub fn new(env: &'a Environment<R>) -> Self {
        Self { env }
    }

    fn script_path(&self, script: &str) -> PathBuf {
        self.env.config.scripts_dir.join(script)
    }

    /// Copy `script` into the runner working directory. The script must
    /// exist on the host.
    async fn stage_script(&self, script: &str) -> WorkflowResult<()> {
        let src = self.script_path(script);
        if !src.is_file() {
            return Err(WorkflowError::ScriptNotFound(src));
        }
        let dest = self.env.config.runner_path(script);
        tracing::info!(src = %src.display(), dest = %dest, "Copying script into runner");
        self.env
            .docker
            .copy_into(&self.env.config.runner_container, &src, &dest)
            .await?;
        Ok(())
    }

    async fn pip_install(&self, packages: &[&str]) {
        let mut args = vec!["pip".to_string(), "install".to_string()];
        args.extend(packages.iter().map(|p| p.to_string()));

        match self
            .env
            .docker
            .exec_unchecked(&self.env.config.runner_container, &args)
            .await
        {
            Ok(out) if out.success() => tracing::info!(?packages, "Installed packages"),
            Ok(out) => tracing::warn!(
                ?packages,
                exit_code = out.exit_code,
                stderr = %out.stderr.trim(),
                "Package install failed, continuing",
            ),
            Err(e) => tracing::warn!(?packages, error = %e, "Package install failed, continuing"),
        }
    }

    async fn run_script(&self, script: &str, extra: &[String]) -> WorkflowResult<CommandOutput> {
        let mut args = vec!["python".to_string(), self.env.config.runner_path(script)];
        args.extend(extra.iter().cloned());
        tracing::info!(script, "Running script in runner");
        let out = self
            .env
            .docker
            .exec(&self.env.config.runner_container, &args)
            .await?;
        print!("{}", out.stdout);
        Ok(out)
    }

    async fn psql(&self, sql: &str) -> WorkflowResult<CommandOutput> {
        let config = &self.env.config;
        Ok(self
            .env
            .docker
            .psql(&config.db_container, &config.db_service_user, &config.db_service_name, sql)
            .await?)
    }
}

impl<R: CommandRunner> WorksBackend for ContainerBackend<'_, R> {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn prepare(&self) -> WorkflowResult<()> {
        self.psql(CREATE_TABLE_SQL).await?;
        Ok(())
    }

    async fn install_extraction_dependencies(&self) {
        self.pip_install(EXTRACTION_PACKAGES).await;
    }

    async fn stage_extraction(&self) -> WorkflowResult<()> {
        self.stage_script(EXTRACT_SCRIPT).await
    }

    async fn truncate(&self) -> WorkflowResult<()> {
        self.psql(&format!("TRUNCATE TABLE {WORKS_TABLE}")).await?;
        tracing::info!(table = WORKS_TABLE, "Truncated table");
        Ok(())
    }

    async fn extract(&self) -> WorkflowResult<ExtractSummary> {
        self.run_script(EXTRACT_SCRIPT, &[]).await?;
        Ok(ExtractSummary {
            source: "script".to_string(),
            works: None,
            inserted: None,
        })
    }

    async fn install_report_dependencies(&self) {
        self.pip_install(REPORT_PACKAGES).await;
    }

    async fn verify(&self) -> WorkflowResult<()> {
        // A runner image may already ship the verification script.
        if self.script_path(VERIFY_SCRIPT).is_file() {
            self.stage_script(VERIFY_SCRIPT).await?;
        } else {
            tracing::debug!(script = VERIFY_SCRIPT, "No local copy, using the runner's");
        }
        self.run_script(VERIFY_SCRIPT, &[]).await?;
        Ok(())
    }

    async fn count(&self) -> WorkflowResult<i64> {
        let out = self
            .psql(&format!("SELECT COUNT(*) FROM {WORKS_TABLE};"))
            .await?;
        Ok(parse_scalar_count(&out.stdout)?)
    }

    async fn stage_export(&self) -> WorkflowResult<()> {
        self.stage_script(EXPORT_SCRIPT).await
    }

    async fn export(&self, remote: &RemoteDbConfig) -> WorkflowResult<ExportSummary> {
        // The password travels as a process argument and is visible to
        // anyone who can list processes in the runner.
        self.run_script(EXPORT_SCRIPT, &remote.to_args()).await?;
        Ok(ExportSummary::default())
    }
}
