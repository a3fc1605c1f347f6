//! ThreatLens: log feature extraction and threat analysis.
//!
//! Modular structure:
//! - [`records`]: Log records and CSV loading
//! - [`features`]: `user=` / `src=` extraction and one-hot encoding
//! - [`model`]: Random-forest threat classifier
//! - [`risk`]: Threat alerts from classifier predictions
//! - [`knowledge`]: Security knowledge graph
//! - [`storage`]: SQLite triple store
//! - [`rag`]: Retrieval-augmented analysis via Ollama
//! - [`report`]: PDF reports with charts
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod records;
pub mod features;
pub mod model;
pub mod risk;
pub mod knowledge;
pub mod storage;
pub mod rag;
pub mod report;
pub mod logging;

pub use config::AppConfig;
pub use records::{FieldValue, LogRecord};
pub use features::{extract, ExtractError, FeatureExtractor, FeatureTable};
pub use model::ThreatClassifier;
pub use risk::RiskEngine;
pub use knowledge::{build_security_kg, KnowledgeGraph};
pub use storage::TripleStore;
pub use rag::ThreatAnalyzer;
pub use logging::StructuredLogger;
