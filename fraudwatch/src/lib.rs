//! Analyst console client for a bank fraud-monitoring backend.
//!
//! The backend does the scoring and storage; this crate talks to it over
//! HTTP, keeps the console's view state and orders transactions for display.

pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod stream;
