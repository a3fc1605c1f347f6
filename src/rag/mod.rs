//! Retrieval-augmented threat analysis against a local language-model server.

mod documents;
mod index;
mod ollama;

pub use documents::{
    chunk_documents, load_documents, write_threat_intel, Chunk, Document, THREAT_INTEL, THREAT_INTEL_FILE,
};
pub use index::VectorIndex;
pub use ollama::OllamaClient;

use crate::config::RagConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("request to model server failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("knowledge base i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("knowledge base has no documents")]
    EmptyIndex,
    #[error("unexpected model server response: {0}")]
    MalformedResponse(String),
}

pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

const ANALYSIS_REQUEST: &str =
    "Provide a detailed analysis of the following security incident, including potential adversaries and countermeasures: ";

/// Query text for an alert
pub fn analysis_query(alert_details: &str) -> String {
    format!("{ANALYSIS_REQUEST}{alert_details}")
}

fn qa_prompt(context: &[&str], query: &str) -> String {
    format!(
        "Context information is below.\n---------------------\n{}\n---------------------\n\
         Given the context information and not prior knowledge, answer the query.\nQuery: {}\nAnswer: ",
        context.join("\n\n"),
        query
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub query: String,
    pub answer: String,
    /// Retrieved chunk texts, most similar first
    pub sources: Vec<String>,
}

pub struct ThreatAnalyzer<E, G> {
    embedder: E,
    generator: G,
    index: VectorIndex,
    top_k: usize,
}

impl ThreatAnalyzer<OllamaClient, OllamaClient> {
    /// Write the built-in knowledge base, load every document in `docs_dir`
    /// and index it through the configured Ollama server.
    pub fn setup(config: &RagConfig) -> Result<Self, RagError> {
        info!(base_url = %config.base_url, model = %config.model, "setting up RAG analyzer");
        write_threat_intel(&config.docs_dir)?;
        let docs = load_documents(&config.docs_dir)?;
        let client = OllamaClient::new(config)?;
        Self::new(client.clone(), client, chunk_documents(&docs), config.top_k)
    }
}

impl<E: Embedder, G: Generator> ThreatAnalyzer<E, G> {
    pub fn new(embedder: E, generator: G, chunks: Vec<Chunk>, top_k: usize) -> Result<Self, RagError> {
        if chunks.is_empty() {
            return Err(RagError::EmptyIndex);
        }
        let index = VectorIndex::build(chunks, &embedder)?;
        Ok(Self {
            embedder,
            generator,
            index,
            top_k: top_k.max(1),
        })
    }

    /// Retrieve context for the alert and ask the model for an analysis.
    pub fn query(&self, alert_details: &str) -> Result<Analysis, RagError> {
        info!(alert = %alert_details, "analyzing threat alert");
        let query = analysis_query(alert_details);
        let qv = self.embedder.embed(&query)?;
        let sources: Vec<String> = self
            .index
            .search(&qv, self.top_k)
            .into_iter()
            .map(|(c, _)| c.text.clone())
            .collect();
        let context: Vec<&str> = sources.iter().map(String::as_str).collect();
        let answer = self.generator.generate(&qa_prompt(&context, &query))?;
        Ok(Analysis { query, answer, sources })
    }
}
