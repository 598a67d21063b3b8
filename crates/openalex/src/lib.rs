//! OpenAlex REST and snapshot client.
//!
//! Resolves the APHRC institution, harvests its works through the
//! paginated `/works` endpoint, and falls back to scanning the gzip
//! JSON-lines files of the public S3 snapshot.

pub mod api;
pub mod extract;
pub mod harvest;
pub mod institution;
pub mod snapshot;
