//! Aggregates backing the verification report.

use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct YearCount {
    pub publication_year: i32,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CitedWork {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub cited_by_count: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct JournalCount {
    pub journal_name: String,
    pub count: i64,
}

/// `access_type` is one of `Open Access`, `Closed Access`, `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AccessCount {
    pub access_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AuthorCount {
    pub author_name: String,
    pub publication_count: i64,
}

/// Everything the `verify` step prints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub total: i64,
    pub by_year: Vec<YearCount>,
    pub most_cited: Vec<CitedWork>,
    pub top_journals: Vec<JournalCount>,
    pub access: Vec<AccessCount>,
    pub top_authors: Vec<AuthorCount>,
}
