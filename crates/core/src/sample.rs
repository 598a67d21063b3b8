//! Placeholder works used when no source yields enough real data.
//!
//! Lets the rest of the pipeline (insert, verification, export) be
//! exercised on a machine without network access to OpenAlex.

use crate::work::{Author, Authorship, HostVenue, OpenAccess, OpenAlexWork};

/// Number of placeholder works generated.
pub const SAMPLE_SIZE: usize = 10;

/// Ten deterministic sample works with distinct ids.
pub fn sample_works() -> Vec<OpenAlexWork> {
    (0..SAMPLE_SIZE).map(sample_work).collect()
}

fn sample_work(i: usize) -> OpenAlexWork {
    let year = 2022 + (i % 3) as i32;
    OpenAlexWork {
        id: Some(format!("https://openalex.org/W27418098{i:02}")),
        title: Some(format!("Sample APHRC publication {}", i + 1)),
        authorships: ["John Doe", "Jane Smith"]
            .into_iter()
            .map(|name| Authorship {
                author: Some(Author {
                    display_name: Some(name.to_string()),
                }),
                institutions: Vec::new(),
            })
            .collect(),
        publication_year: Some(year),
        publication_date: Some(format!("{year}-{:02}-15", (i % 12) + 1)),
        doi: Some(format!("10.1234/aphrc.{}", 5678 + i)),
        open_access: Some(OpenAccess {
            is_oa: Some(i % 2 == 0),
        }),
        host_venue: Some(HostVenue {
            display_name: Some(format!("Journal of African Health Research {}", i % 5 + 1)),
            volume: Some(format!("{}", 10 + (i % 5))),
            issue: Some(format!("{}", 1 + (i % 4))),
        }),
        cited_by_count: Some((i * 3) as i32),
        work_type: Some("journal-article".to_string()),
        ..Default::default()
    }
}
