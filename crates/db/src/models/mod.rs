//! Row models for the `aphrc_works` table and its report queries.

pub mod report;
pub mod work;
