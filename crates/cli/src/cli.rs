//! Command-line definition.

use std::path::PathBuf;
use std::time::Duration;

use aphrc_core::config::{EnvironmentConfig, PartialRemoteDbConfig, RunnerMode};
use clap::{Args, Parser, Subcommand};

use crate::backend::native::DEFAULT_EXPORT_BATCH;

#[derive(Parser, Debug)]
#[command(
    name = "aphrc",
    version,
    about = "Extract APHRC works from OpenAlex into PostgreSQL and export them"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Where extraction, verification and export run. Native mode
    /// connects from the host to DB_HOST (default localhost)
    #[arg(long, global = true, env = "APHRC_MODE", default_value = "native")]
    pub mode: RunnerMode,

    /// Compose file used to start the containers
    #[arg(long, global = true, value_name = "PATH", default_value = "docker-compose.yml")]
    pub compose_file: PathBuf,

    /// Name of the PostgreSQL container
    #[arg(long, global = true, default_value = "openalex_db")]
    pub db_container: String,

    /// Name of the script runner container
    #[arg(long, global = true, default_value = "openalex_runner")]
    pub runner_container: String,

    /// Host directory holding the external scripts (container mode)
    #[arg(long, global = true, value_name = "PATH", default_value = "scripts")]
    pub scripts_dir: PathBuf,

    /// Seconds to wait for the database to accept queries
    #[arg(long, global = true, default_value_t = 60)]
    pub readiness_timeout_secs: u64,

    /// Do not check or start the containers
    #[arg(long, global = true)]
    pub skip_bootstrap: bool,
}

impl GlobalOpts {
    pub fn environment(&self) -> EnvironmentConfig {
        EnvironmentConfig {
            compose_file: self.compose_file.clone(),
            db_container: self.db_container.clone(),
            runner_container: self.runner_container.clone(),
            scripts_dir: self.scripts_dir.clone(),
            readiness_timeout: Duration::from_secs(self.readiness_timeout_secs),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the containers and wait for the database
    Up,

    /// Refresh the works table from OpenAlex
    Import(ImportArgs),

    /// Print the verification report
    Verify(VerifyArgs),

    /// Print the number of stored works
    Count,

    /// Copy the stored works to a remote PostgreSQL database
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Skip the verification report after extraction
    #[arg(long)]
    pub skip_verify: bool,

    /// Snapshot files scanned when the API yields too few works (native mode)
    #[arg(long, value_name = "N")]
    pub max_snapshot_files: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Print the report as JSON (native mode)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Remote database name
    #[arg(long)]
    pub dbname: Option<String>,

    /// Remote user
    #[arg(long)]
    pub user: Option<String>,

    /// Remote password (prefer REMOTE_DB_PASSWORD or the prompt)
    #[arg(long)]
    pub password: Option<String>,

    /// Remote host
    #[arg(long)]
    pub host: Option<String>,

    /// Remote port, blank for 5432
    #[arg(long)]
    pub port: Option<String>,

    /// Rows copied per batch (native mode)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_EXPORT_BATCH)]
    pub batch_size: i64,
}

impl ExportArgs {
    /// Remote parameters given as flags, with `REMOTE_DB_*` filling gaps.
    pub fn remote(&self) -> PartialRemoteDbConfig {
        PartialRemoteDbConfig {
            dbname: self.dbname.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
        }
        .or(PartialRemoteDbConfig::from_env())
    }
}
