//! `aphrc_works` row model.

use aphrc_core::work::WorkRecord;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// A row as stored. Every non-key column is nullable because the remote
/// export target may have been populated by other tools.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Work {
    pub id: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub doi: Option<String>,
    pub open_access: Option<bool>,
    pub journal_name: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub cited_by_count: Option<i32>,
    #[sqlx(rename = "type")]
    pub work_type: Option<String>,
    #[sqlx(rename = "abstract")]
    pub abstract_text: Option<String>,
}

impl From<WorkRecord> for Work {
    fn from(r: WorkRecord) -> Self {
        Self {
            id: r.id,
            title: Some(r.title),
            authors: Some(r.authors),
            publication_year: r.publication_year,
            publication_date: r.publication_date,
            doi: Some(r.doi),
            open_access: Some(r.open_access),
            journal_name: Some(r.journal_name),
            volume: Some(r.volume),
            issue: Some(r.issue),
            cited_by_count: Some(r.cited_by_count),
            work_type: Some(r.work_type),
            abstract_text: Some(r.abstract_text),
        }
    }
}
