//! Threat intelligence documents: the built-in knowledge base, directory loading, chunking.

use super::RagError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const THREAT_INTEL_FILE: &str = "threat_intel.txt";

pub const THREAT_INTEL: &str = "A brute-force attack involves repeated, systematic attempts to guess a password. \
This technique is often automated and can be detected by monitoring for multiple failed login attempts from a single source IP.\n\
Advanced Persistent Threat (APT) group APT29 is known to use brute-force attacks to gain initial access to target networks. \
Their tactics, techniques, and procedures (TTPs) often evolve to evade detection.\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// sha256 of the chunk text
    pub id: String,
    pub source: PathBuf,
    pub text: String,
}

impl Chunk {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut h = Sha256::new();
        h.update(text.as_bytes());
        Self {
            id: format!("{:x}", h.finalize()),
            source: source.into(),
            text,
        }
    }
}

/// Write the built-in knowledge base into `dir` (created if missing).
pub fn write_threat_intel(dir: &Path) -> Result<PathBuf, RagError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(THREAT_INTEL_FILE);
    std::fs::write(&path, THREAT_INTEL)?;
    Ok(path)
}

fn is_text_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("md")
    )
}

/// Every `.txt` / `.md` file under `dir`, in file-name order.
pub fn load_documents(dir: &Path) -> Result<Vec<Document>, RagError> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| RagError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_text_document(path) {
            continue;
        }
        docs.push(Document {
            path: path.to_path_buf(),
            text: std::fs::read_to_string(path)?,
        });
    }
    Ok(docs)
}

/// One chunk per non-empty line; identical lines are kept once.
pub fn chunk_documents(docs: &[Document]) -> Vec<Chunk> {
    let mut seen = HashSet::new();
    docs.iter()
        .flat_map(|d| {
            d.text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(move |l| Chunk::new(&d.path, l))
        })
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}
