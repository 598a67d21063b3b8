//! Rendering of the verification report.

use aphrc_db::models::report::VerificationReport;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};

use crate::error::WorkflowResult;

/// Render every section of `report` as plain text with tables.
pub fn render(report: &VerificationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total APHRC works in database: {}\n", report.total));

    section(
        &mut out,
        "Works by publication year",
        &["Year", "Count"],
        report
            .by_year
            .iter()
            .map(|y| vec![y.publication_year.to_string(), y.count.to_string()]),
    );
    section(
        &mut out,
        "Most cited works",
        &["Title", "Year", "Citations"],
        report.most_cited.iter().map(|w| {
            vec![
                w.title.clone().unwrap_or_default(),
                opt(w.publication_year),
                opt(w.cited_by_count),
            ]
        }),
    );
    section(
        &mut out,
        "Top journals",
        &["Journal", "Count"],
        report
            .top_journals
            .iter()
            .map(|j| vec![j.journal_name.clone(), j.count.to_string()]),
    );
    section(
        &mut out,
        "Open access",
        &["Access", "Count"],
        report
            .access
            .iter()
            .map(|a| vec![a.access_type.clone(), a.count.to_string()]),
    );
    section(
        &mut out,
        "Top authors",
        &["Author", "Publications"],
        report
            .top_authors
            .iter()
            .map(|a| vec![a.author_name.clone(), a.publication_count.to_string()]),
    );

    out
}

pub fn to_json(report: &VerificationReport) -> WorkflowResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn section<I>(out: &mut String, title: &str, header: &[&str], rows: I)
where
    I: Iterator<Item = Vec<String>>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    let mut empty = true;
    for row in rows {
        table.add_row(row);
        empty = false;
    }

    out.push('\n');
    out.push_str(title);
    out.push('\n');
    if empty {
        out.push_str("(none)\n");
    } else {
        out.push_str(&table.to_string());
        out.push('\n');
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
