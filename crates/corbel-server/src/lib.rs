//! Corbel audit HTTP service
//!
//! Serves the audit page, the JSON audit API and the health/metrics
//! endpoints on top of `corbel-lib`.

pub mod api;
pub mod config;
pub mod page;
