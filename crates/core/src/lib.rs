//! `aphrc-core` -- pure domain logic for the APHRC works pipeline.
//!
//! Configuration types, the `aphrc_works` record model and its mapping
//! from OpenAlex JSON, and the Docker command plumbing used by the
//! bootstrap and container-mode workflows. Nothing in this crate talks
//! to a database.

pub mod config;
pub mod docker;
pub mod error;
pub mod process;
pub mod readiness;
pub mod sample;
pub mod work;
