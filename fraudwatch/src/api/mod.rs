//! Transport clients for the fraud-monitoring backend.
//!
//! Every authenticated call sends `Authorization: Bearer <token>`. A 401 is
//! surfaced as [`ApiError::Unauthenticated`]; callers hand the result to
//! [`Session::observe`](crate::core::session::Session::observe) to apply the
//! logout policy.

mod auth;
mod client;
mod dashboard;
mod error;
pub mod models;
mod transactions;

pub use client::ApiClient;
pub use error::ApiError;
pub use transactions::report_file_name;
