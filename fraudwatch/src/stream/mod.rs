pub mod chat;
pub mod metrics;
