//! The export workflow: copy `aphrc_works` to a remote database.

use aphrc_core::config::PartialRemoteDbConfig;

use crate::backend::{ExportSummary, WorksBackend};
use crate::error::{WorkflowError, WorkflowResult};
use crate::prompt::{resolve_remote_config, Prompter};

/// Printed once the export step returns successfully.
pub const COMPLETION_MESSAGE: &str = "Export process completed";

/// Refuse to export an empty table, then resolve the target and copy.
///
/// Nothing is prompted for when the table is empty.
pub async fn run<B, P>(
    backend: &B,
    partial: PartialRemoteDbConfig,
    prompter: &P,
) -> WorkflowResult<ExportSummary>
where
    B: WorksBackend,
    P: Prompter + ?Sized,
{
    backend.prepare().await?;
    let count = backend.count().await?;
    if count == 0 {
        return Err(WorkflowError::NoRecords);
    }
    println!("Found {count} records to export");

    let remote = resolve_remote_config(partial, prompter)?;
    backend.stage_export().await?;
    let summary = backend.export(&remote).await?;

    println!("{COMPLETION_MESSAGE}");
    Ok(summary)
}
