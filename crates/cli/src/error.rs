use std::path::PathBuf;

use aphrc_core::docker::DockerError;
use aphrc_core::error::CoreError;
use aphrc_core::readiness::NotReady;
use aphrc_db::DbError;

/// Exit status when an export finds nothing to export.
pub const EXIT_NO_RECORDS: i32 = 1;

/// Exit status for every other workflow failure.
pub const EXIT_FAILURE: i32 = 2;

/// Any failure that aborts a workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No records found to export. Please run the import first.")]
    NoRecords,

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    NotReady(#[from] NotReady),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoRecords => EXIT_NO_RECORDS,
            _ => EXIT_FAILURE,
        }
    }

    /// Outcomes the user is told about plainly on stdout rather than
    /// reported as a failure.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoRecords)
    }
}
