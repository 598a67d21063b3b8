//! The import workflow: refresh `aphrc_works` from OpenAlex.

use crate::backend::{ExtractSummary, WorksBackend};
use crate::error::WorkflowResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Skip the dependency install and report after extraction.
    pub skip_verify: bool,
}

/// Run the import steps in order, aborting at the first failure.
///
/// The table is created if needed and emptied before extraction, so every
/// import is a full refresh. The caller has already made sure the
/// environment is up.
pub async fn run<B: WorksBackend>(
    backend: &B,
    options: ImportOptions,
) -> WorkflowResult<ExtractSummary> {
    tracing::info!(backend = backend.name(), "Starting import");

    backend.install_extraction_dependencies().await;
    backend.stage_extraction().await?;
    backend.prepare().await?;
    backend.truncate().await?;

    let summary = backend.extract().await?;
    tracing::info!(
        source = %summary.source,
        works = ?summary.works,
        inserted = ?summary.inserted,
        "Extraction complete",
    );

    if options.skip_verify {
        tracing::info!("Skipping verification");
    } else {
        backend.install_report_dependencies().await;
        backend.verify().await?;
    }

    Ok(summary)
}
