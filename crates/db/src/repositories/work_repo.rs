//! Repository for the `aphrc_works` table.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::report::{
    AccessCount, AuthorCount, CitedWork, JournalCount, VerificationReport, YearCount,
};
use crate::models::work::Work;

/// Column list for `aphrc_works` queries.
const COLUMNS: &str = "\
    id, title, authors, publication_year, publication_date, \
    doi, open_access, journal_name, volume, issue, \
    cited_by_count, type, abstract";

/// Idempotent DDL, applied to both the local and the remote database.
pub const CREATE_TABLE_SQL: &str = "\
    CREATE TABLE IF NOT EXISTS aphrc_works (\
        id TEXT PRIMARY KEY, \
        title TEXT, \
        authors TEXT, \
        publication_year INTEGER, \
        publication_date DATE, \
        doi TEXT, \
        open_access BOOLEAN, \
        journal_name TEXT, \
        volume TEXT, \
        issue TEXT, \
        cited_by_count INTEGER, \
        type TEXT, \
        abstract TEXT\
    )";

/// Rows per `INSERT` statement. 13 binds per row keeps this far below
/// the 65535 bind-parameter limit.
const INSERT_CHUNK: usize = 500;

/// Limits used by [`WorkRepo::verification_report`].
pub const REPORT_TOP_CITED: i64 = 5;
pub const REPORT_TOP_JOURNALS: i64 = 5;
pub const REPORT_TOP_AUTHORS: i64 = 10;

/// Provides query operations for extracted works.
pub struct WorkRepo;

impl WorkRepo {
    /// Create the table if it does not exist yet.
    pub async fn ensure_table(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TABLE_SQL).execute(pool).await?;
        Ok(())
    }

    /// Remove every row.
    pub async fn truncate(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("TRUNCATE TABLE aphrc_works").execute(pool).await?;
        Ok(())
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM aphrc_works")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Insert `works`, skipping ids that already exist.
    ///
    /// Runs in a single transaction. Returns the number of rows actually
    /// inserted.
    pub async fn insert_batch(pool: &PgPool, works: &[Work]) -> Result<u64, sqlx::Error> {
        if works.is_empty() {
            return Ok(0);
        }

        let mut tx = pool.begin().await?;
        let mut inserted = 0u64;

        for chunk in works.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new(format!("INSERT INTO aphrc_works ({COLUMNS}) "));
            qb.push_values(chunk, |mut row, w| {
                row.push_bind(&w.id)
                    .push_bind(&w.title)
                    .push_bind(&w.authors)
                    .push_bind(w.publication_year)
                    .push_bind(w.publication_date)
                    .push_bind(&w.doi)
                    .push_bind(w.open_access)
                    .push_bind(&w.journal_name)
                    .push_bind(&w.volume)
                    .push_bind(&w.issue)
                    .push_bind(w.cited_by_count)
                    .push_bind(&w.work_type)
                    .push_bind(&w.abstract_text);
            });
            qb.push(" ON CONFLICT (id) DO NOTHING");

            inserted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// One page of rows in stable id order.
    pub async fn list_page(pool: &PgPool, offset: i64, limit: i64) -> Result<Vec<Work>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM aphrc_works ORDER BY id LIMIT $1 OFFSET $2");
        sqlx::query_as::<_, Work>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<Work>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM aphrc_works ORDER BY id");
        sqlx::query_as::<_, Work>(&query).fetch_all(pool).await
    }

    /// Publication counts per year, newest first.
    pub async fn counts_by_year(pool: &PgPool) -> Result<Vec<YearCount>, sqlx::Error> {
        sqlx::query_as::<_, YearCount>(
            "SELECT publication_year, COUNT(*) AS count \
             FROM aphrc_works \
             WHERE publication_year IS NOT NULL \
             GROUP BY publication_year \
             ORDER BY publication_year DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn most_cited(pool: &PgPool, limit: i64) -> Result<Vec<CitedWork>, sqlx::Error> {
        sqlx::query_as::<_, CitedWork>(
            "SELECT title, publication_year, cited_by_count \
             FROM aphrc_works \
             ORDER BY cited_by_count DESC NULLS LAST, id \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn top_journals(pool: &PgPool, limit: i64) -> Result<Vec<JournalCount>, sqlx::Error> {
        sqlx::query_as::<_, JournalCount>(
            "SELECT journal_name, COUNT(*) AS count \
             FROM aphrc_works \
             WHERE journal_name IS NOT NULL AND journal_name <> '' \
             GROUP BY journal_name \
             ORDER BY COUNT(*) DESC, journal_name \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn access_breakdown(pool: &PgPool) -> Result<Vec<AccessCount>, sqlx::Error> {
        sqlx::query_as::<_, AccessCount>(
            "SELECT \
                CASE \
                    WHEN open_access = true THEN 'Open Access' \
                    WHEN open_access = false THEN 'Closed Access' \
                    ELSE 'Unknown' \
                END AS access_type, \
                COUNT(*) AS count \
             FROM aphrc_works \
             GROUP BY access_type \
             ORDER BY access_type",
        )
        .fetch_all(pool)
        .await
    }

    /// Most frequent names in the comma-separated `authors` column.
    pub async fn top_authors(pool: &PgPool, limit: i64) -> Result<Vec<AuthorCount>, sqlx::Error> {
        sqlx::query_as::<_, AuthorCount>(
            "WITH author_split AS ( \
                SELECT TRIM(unnest(string_to_array(authors, ','))) AS author_name \
                FROM aphrc_works \
             ) \
             SELECT author_name, COUNT(*) AS publication_count \
             FROM author_split \
             WHERE author_name <> '' \
             GROUP BY author_name \
             ORDER BY publication_count DESC, author_name \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Run every report query.
    pub async fn verification_report(pool: &PgPool) -> Result<VerificationReport, sqlx::Error> {
        Ok(VerificationReport {
            total: Self::count(pool).await?,
            by_year: Self::counts_by_year(pool).await?,
            most_cited: Self::most_cited(pool, REPORT_TOP_CITED).await?,
            top_journals: Self::top_journals(pool, REPORT_TOP_JOURNALS).await?,
            access: Self::access_breakdown(pool).await?,
            top_authors: Self::top_authors(pool, REPORT_TOP_AUTHORS).await?,
        })
    }
}
