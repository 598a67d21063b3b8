//! Runner backends.
//!
//! A [`WorksBackend`] performs the individual steps of the import and
//! export workflows. [`native::NativeBackend`] does the work in-process;
//! [`container::ContainerBackend`] copies the external scripts into the
//! runner container and executes them there. The workflows only see
//! this trait, so both modes share the same ordering and guards.

use std::future::Future;

use aphrc_core::config::RemoteDbConfig;

use crate::error::WorkflowResult;

pub mod container;
pub mod native;

/// Result of the extraction step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Where the works came from (`api`, `snapshot`, `sample`, `script`).
    pub source: String,
    /// Works produced by the extraction, when known.
    pub works: Option<usize>,
    /// Rows written to the table, when known.
    pub inserted: Option<u64>,
}

/// Result of the export step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Rows read from the local table, when known.
    pub transferred: Option<u64>,
    /// Rows newly written to the remote table, when known.
    pub inserted: Option<u64>,
}

/// The steps a runner backend provides.
///
/// Installs are best-effort and cannot fail; every other step returns a
/// `Result` the workflow propagates.
pub trait WorksBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Make sure the target table exists.
    fn prepare(&self) -> impl Future<Output = WorkflowResult<()>> + Send;

    /// Best-effort install of the extraction's third-party packages.
    fn install_extraction_dependencies(&self) -> impl Future<Output = ()> + Send;

    /// Place the extraction program where it will run.
    fn stage_extraction(&self) -> impl Future<Output = WorkflowResult<()>> + Send;

    /// Delete every row of the target table.
    fn truncate(&self) -> impl Future<Output = WorkflowResult<()>> + Send;

    /// Repopulate the target table.
    fn extract(&self) -> impl Future<Output = WorkflowResult<ExtractSummary>> + Send;

    /// Best-effort install of the reporting dependency.
    fn install_report_dependencies(&self) -> impl Future<Output = ()> + Send;

    /// Print the verification report for the current table contents.
    fn verify(&self) -> impl Future<Output = WorkflowResult<()>> + Send;

    /// Number of rows in the target table.
    fn count(&self) -> impl Future<Output = WorkflowResult<i64>> + Send;

    /// Place the export program where it will run.
    fn stage_export(&self) -> impl Future<Output = WorkflowResult<()>> + Send;

    /// Copy the table to `remote`.
    fn export(
        &self,
        remote: &RemoteDbConfig,
    ) -> impl Future<Output = WorkflowResult<ExportSummary>> + Send;
}
