#![deny(missing_docs)]

//! Core library for the financial document analyzer service.

/// Query-driven analysis of extracted document text.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction.
pub mod extraction;
/// Language-model client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Request metrics helpers.
pub mod metrics;
/// Upload-to-analysis request pipeline.
pub mod pipeline;
