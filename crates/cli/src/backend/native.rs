//! In-process backend: OpenAlex over HTTP, PostgreSQL through `sqlx`.

use aphrc_core::config::RemoteDbConfig;
use aphrc_core::work::WorkRecord;
use aphrc_db::models::work::Work;
use aphrc_db::repositories::WorkRepo;
use aphrc_db::{create_pool, DbPool};
use aphrc_openalex::api::OpenAlexApi;
use aphrc_openalex::extract::{extract_works, ExtractConfig};

use super::{ExportSummary, ExtractSummary, WorksBackend};
use crate::error::WorkflowResult;
use crate::report;

/// Rows copied per round trip during export.
pub const DEFAULT_EXPORT_BATCH: i64 = 100;

/// How `verify` prints its report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

pub struct NativeBackend {
    pool: DbPool,
    api: OpenAlexApi,
    extract_config: ExtractConfig,
    batch_size: i64,
    report_format: ReportFormat,
}

impl NativeBackend {
    pub fn new(pool: DbPool, api: OpenAlexApi) -> Self {
        Self {
            pool,
            api,
            extract_config: ExtractConfig::default(),
            batch_size: DEFAULT_EXPORT_BATCH,
            report_format: ReportFormat::default(),
        }
    }

    pub fn with_extract_config(mut self, config: ExtractConfig) -> Self {
        self.extract_config = config;
        self
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }
}

impl WorksBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn prepare(&self) -> WorkflowResult<()> {
        WorkRepo::ensure_table(&self.pool).await?;
        Ok(())
    }

    async fn install_extraction_dependencies(&self) {
        tracing::debug!("Native extraction has no packages to install");
    }

    async fn stage_extraction(&self) -> WorkflowResult<()> {
        Ok(())
    }

    async fn truncate(&self) -> WorkflowResult<()> {
        WorkRepo::truncate(&self.pool).await?;
        tracing::info!("Truncated aphrc_works");
        Ok(())
    }

    async fn extract(&self) -> WorkflowResult<ExtractSummary> {
        let extraction = extract_works(&self.api, &self.extract_config).await;
        let rows: Vec<Work> = extraction
            .works
            .iter()
            .map(|w| Work::from(WorkRecord::from_openalex(w)))
            .collect();

        let inserted = WorkRepo::insert_batch(&self.pool, &rows).await?;
        tracing::info!(
            source = %extraction.source,
            works = rows.len(),
            inserted,
            "Stored works",
        );

        Ok(ExtractSummary {
            source: extraction.source.to_string(),
            works: Some(rows.len()),
            inserted: Some(inserted),
        })
    }

    async fn install_report_dependencies(&self) {
        tracing::debug!("Native report has no packages to install");
    }

    async fn verify(&self) -> WorkflowResult<()> {
        let report = WorkRepo::verification_report(&self.pool).await?;
        match self.report_format {
            ReportFormat::Table => println!("{}", report::render(&report)),
            ReportFormat::Json => println!("{}", report::to_json(&report)?),
        }
        Ok(())
    }

    async fn count(&self) -> WorkflowResult<i64> {
        Ok(WorkRepo::count(&self.pool).await?)
    }

    async fn stage_export(&self) -> WorkflowResult<()> {
        Ok(())
    }

    async fn export(&self, remote: &RemoteDbConfig) -> WorkflowResult<ExportSummary> {
        tracing::info!(host = %remote.host, port = remote.port, dbname = %remote.dbname, "Connecting to remote database");
        let target = create_pool(&remote.connection_url()).await?;
        WorkRepo::ensure_table(&target).await?;

        let total = WorkRepo::count(&self.pool).await?;
        let mut offset = 0i64;
        let mut transferred = 0u64;
        let mut inserted = 0u64;

        loop {
            let page = WorkRepo::list_page(&self.pool, offset, self.batch_size).await?;
            if page.is_empty() {
                break;
            }
            inserted += WorkRepo::insert_batch(&target, &page).await?;
            transferred += page.len() as u64;
            offset += page.len() as i64;
            tracing::info!(transferred, total, "Exported batch");
        }

        target.close().await;
        tracing::info!(transferred, inserted, skipped = transferred - inserted, "Export finished");
        Ok(ExportSummary {
            transferred: Some(transferred),
            inserted: Some(inserted),
        })
    }
}
