//! Personalized product push notifications for retail banking clients.
//!
//! Client tables are aggregated into behavioural profiles, scored against a
//! fixed product catalog, and turned into one push notification per client.

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
pub mod extract;
pub mod llm;
pub mod models;
pub mod notify;
pub mod profile;
pub mod report;
pub mod scoring;
pub mod select;
pub mod text;

pub use error::{PipelineError, Result};
