//! APHRC institution resolution.

use aphrc_core::work::strip_openalex_prefix;

use crate::api::OpenAlexApi;

/// Canonical display name of the institution.
pub const APHRC_NAME: &str = "African Population and Health Research Center";

/// Ids tried first, in order.
pub const KNOWN_INSTITUTION_IDS: &[&str] = &["I4210152772", "I875800504"];

/// Id used when neither lookup nor search confirms the institution.
pub const FALLBACK_INSTITUTION_ID: &str = "I4210152772";

/// How the institution id was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KnownId,
    Search,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstitution {
    /// Short id (no `https://openalex.org/` prefix).
    pub id: String,
    pub display_name: String,
    pub resolution: Resolution,
}

fn is_aphrc(display_name: &str) -> bool {
    display_name.contains(APHRC_NAME)
}

/// Find the APHRC institution id.
///
/// Tries each of [`KNOWN_INSTITUTION_IDS`], then a name search, and
/// finally settles on [`FALLBACK_INSTITUTION_ID`]. Lookup failures are
/// logged and never fatal.
pub async fn resolve_institution(api: &OpenAlexApi) -> ResolvedInstitution {
    for &id in KNOWN_INSTITUTION_IDS {
        match api.get_institution(id).await {
            Ok(inst) if is_aphrc(&inst.display_name) => {
                tracing::info!(institution_id = id, "Found APHRC by known id");
                return ResolvedInstitution {
                    id: id.to_string(),
                    display_name: inst.display_name,
                    resolution: Resolution::KnownId,
                };
            }
            Ok(inst) => {
                tracing::debug!(institution_id = id, display_name = %inst.display_name, "Known id is not APHRC");
            }
            Err(e) => {
                tracing::warn!(institution_id = id, error = %e, "Institution lookup failed");
            }
        }
    }

    match api.search_institutions(APHRC_NAME).await {
        Ok(results) => {
            if let Some(inst) = results.into_iter().find(|i| is_aphrc(&i.display_name)) {
                let id = strip_openalex_prefix(&inst.id).to_string();
                tracing::info!(institution_id = %id, "Found APHRC by name search");
                return ResolvedInstitution {
                    id,
                    display_name: inst.display_name,
                    resolution: Resolution::Search,
                };
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Institution search failed");
        }
    }

    tracing::warn!(
        institution_id = FALLBACK_INSTITUTION_ID,
        "Could not confirm APHRC institution, using fallback id",
    );
    ResolvedInstitution {
        id: FALLBACK_INSTITUTION_ID.to_string(),
        display_name: APHRC_NAME.to_string(),
        resolution: Resolution::Fallback,
    }
}
