//! `aphrc-cli` -- workflows behind the `aphrc` binary.
//!
//! The binary brings up the container environment ([`bootstrap`]), picks
//! a [`backend::WorksBackend`] for the selected runner mode and hands it
//! to the [`import`] or [`export`] workflow.

pub mod app;
pub mod backend;
pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod export;
pub mod import;
pub mod prompt;
pub mod report;
