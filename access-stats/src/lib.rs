//! Parses Apache Combined Log Format access logs and summarizes them.
//!
//! [`parser`] turns log text into [`models::LogRecord`]s, silently skipping
//! lines that do not match the grammar. [`analytics::Analytics`] counts them
//! by day, ISO week and month, classifies status codes, finds the most and
//! least requested request lines and slices out the last six months.
//! [`ingest`] and [`report`] are the file and network glue around them.

pub mod analytics;
pub mod error;
pub mod ingest;
pub mod invariants;
pub mod models;
pub mod parser;
pub mod report;
