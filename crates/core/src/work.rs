//! The `aphrc_works` record model and its mapping from OpenAlex JSON.
//!
//! [`OpenAlexWork`] is a lenient view of the OpenAlex work schema: every
//! field is optional, JSON `null` is treated like a missing key, and
//! unknown fields are ignored. [`WorkRecord`] is the flat 13-column row
//! stored in the database.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix OpenAlex puts in front of every entity id.
pub const OPENALEX_ID_PREFIX: &str = "https://openalex.org/";

/// Highest word position accepted when rebuilding an abstract. Indexes
/// pointing past this are dropped instead of allocating a huge buffer.
pub const MAX_ABSTRACT_POSITIONS: usize = 100_000;

// ---------------------------------------------------------------------------
// OpenAlex JSON view
// ---------------------------------------------------------------------------

/// A single work as returned by the OpenAlex API or snapshot files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexWork {
    pub id: Option<String>,
    pub title: Option<String>,
    pub display_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub authorships: Vec<Authorship>,
    pub publication_year: Option<i32>,
    pub publication_date: Option<String>,
    pub doi: Option<String>,
    pub open_access: Option<OpenAccess>,
    pub host_venue: Option<HostVenue>,
    pub primary_location: Option<Location>,
    pub biblio: Option<Biblio>,
    pub cited_by_count: Option<i32>,
    #[serde(rename = "type")]
    pub work_type: Option<String>,
    pub abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorship {
    pub author: Option<Author>,
    #[serde(deserialize_with = "null_as_default")]
    pub institutions: Vec<InstitutionRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    pub display_name: Option<String>,
}

/// Institution reference embedded in an authorship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionRef {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAccess {
    pub is_oa: Option<bool>,
}

/// Legacy venue block. Newer OpenAlex responses carry
/// `primary_location` and `biblio` instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostVenue {
    pub display_name: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub source: Option<Source>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Biblio {
    pub volume: Option<String>,
    pub issue: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl OpenAlexWork {
    /// Work id without the `https://openalex.org/` prefix.
    pub fn short_id(&self) -> String {
        self.id
            .as_deref()
            .map(strip_openalex_prefix)
            .unwrap_or_default()
            .to_string()
    }

    /// True when any authorship lists `institution_id` (prefix-insensitive).
    pub fn is_affiliated_with(&self, institution_id: &str) -> bool {
        let wanted = strip_openalex_prefix(institution_id);
        self.authorships
            .iter()
            .flat_map(|a| a.institutions.iter())
            .filter_map(|inst| inst.id.as_deref())
            .any(|id| strip_openalex_prefix(id) == wanted)
    }

    /// Distinct institution display names across all authorships, sorted.
    pub fn affiliation_names(&self) -> Vec<String> {
        self.authorships
            .iter()
            .flat_map(|a| a.institutions.iter())
            .filter_map(|inst| inst.display_name.clone())
            .filter(|name| !name.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// True when an affiliation explicitly names APHRC, either in full or
    /// by acronym.
    pub fn mentions_aphrc(&self) -> bool {
        self.affiliation_names().iter().any(|name| {
            let lower = name.to_lowercase();
            (lower.contains("african population") && lower.contains("health research"))
                || lower.contains("aphrc")
        })
    }
}

/// Strip the `https://openalex.org/` prefix from an OpenAlex id.
pub fn strip_openalex_prefix(id: &str) -> &str {
    id.strip_prefix(OPENALEX_ID_PREFIX).unwrap_or(id)
}

/// Rebuild abstract text from OpenAlex's inverted index.
///
/// Each word is written at every position it lists; positions never
/// mentioned stay empty strings, so gaps show up as doubled spaces.
pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<usize>>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for (word, positions) in index {
        for &pos in positions {
            if pos >= MAX_ABSTRACT_POSITIONS {
                continue;
            }
            if words.len() <= pos {
                words.resize(pos + 1, "");
            }
            words[pos] = word.as_str();
        }
    }
    words.join(" ")
}

// ---------------------------------------------------------------------------
// Flat row
// ---------------------------------------------------------------------------

/// One row of `aphrc_works`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub publication_year: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub doi: String,
    pub open_access: bool,
    pub journal_name: String,
    pub volume: String,
    pub issue: String,
    pub cited_by_count: i32,
    pub work_type: String,
    pub abstract_text: String,
}

impl WorkRecord {
    /// Flatten an OpenAlex work into a table row.
    pub fn from_openalex(work: &OpenAlexWork) -> Self {
        let authors = work
            .authorships
            .iter()
            .filter_map(|a| a.author.as_ref()?.display_name.as_deref())
            .collect::<Vec<_>>()
            .join(", ");

        let venue = work.host_venue.as_ref();
        let journal_name = venue
            .and_then(|v| v.display_name.clone())
            .or_else(|| {
                work.primary_location
                    .as_ref()?
                    .source
                    .as_ref()?
                    .display_name
                    .clone()
            })
            .unwrap_or_default();
        let volume = venue
            .and_then(|v| v.volume.clone())
            .or_else(|| work.biblio.as_ref()?.volume.clone())
            .unwrap_or_default();
        let issue = venue
            .and_then(|v| v.issue.clone())
            .or_else(|| work.biblio.as_ref()?.issue.clone())
            .unwrap_or_default();

        let abstract_text = work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract)
            .unwrap_or_default();

        Self {
            id: work.short_id(),
            title: work
                .title
                .clone()
                .or_else(|| work.display_name.clone())
                .unwrap_or_default(),
            authors,
            publication_year: work.publication_year,
            publication_date: work
                .publication_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            doi: work.doi.clone().unwrap_or_default(),
            open_access: work
                .open_access
                .as_ref()
                .and_then(|oa| oa.is_oa)
                .unwrap_or(false),
            journal_name,
            volume,
            issue,
            cited_by_count: work.cited_by_count.unwrap_or(0),
            work_type: work.work_type.clone().unwrap_or_default(),
            abstract_text,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
