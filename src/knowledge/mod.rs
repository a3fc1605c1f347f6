//! Security knowledge graph: a small set of RDF-style triples describing
//! threats, techniques and actors, with one fixed lookup and Turtle output.

mod turtle;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use turtle::to_turtle;

/// Namespace of the security ontology
pub const SECURITY_NS: &str = "http://example.org/security_ontology/";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Iri { value: String },
    Literal { value: String, datatype: Option<String> },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri { value: value.into() }
    }

    /// IRI inside the security namespace
    pub fn security(local: &str) -> Self {
        Term::iri(format!("{SECURITY_NS}{local}"))
    }

    pub fn string_literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: Some(XSD_STRING.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Term::Iri { value } | Term::Literal { value, .. } => value,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

/// In-memory graph with set semantics; insertion order is kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    triples: Vec<Triple>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the triple was already present
    pub fn add(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        self.triples.push(triple);
        true
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Objects of every `(subject, predicate, ?o)` match
    pub fn objects(&self, subject: &Term, predicate: &Term) -> Vec<&Term> {
        self.triples
            .iter()
            .filter(|t| &t.subject == subject && &t.predicate == predicate)
            .map(|t| &t.object)
            .collect()
    }

    /// Techniques an actor uses: `<actor> so:uses ?technique`
    pub fn techniques_used_by(&self, actor: &Term) -> Vec<&Term> {
        self.objects(actor, &Term::security("uses"))
    }

    pub fn to_turtle(&self) -> String {
        to_turtle(&self.triples)
    }
}

impl FromIterator<Triple> for KnowledgeGraph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut g = KnowledgeGraph::new();
        for t in iter {
            g.add(t);
        }
        g
    }
}

/// The built-in security ontology: three classes, two threats, one actor.
pub fn build_security_kg() -> KnowledgeGraph {
    let rdf_type = Term::iri(RDF_TYPE);
    let class = Term::iri(RDFS_CLASS);
    let threat = Term::security("Threat");
    let related_to = Term::security("related_to");

    let brute_force = Term::security("BruteForceAttack");
    let malware = Term::security("MalwareCampaign");
    let apt29 = Term::security("APT29");

    let mut g = KnowledgeGraph::new();
    for c in ["Threat", "Technique", "Actor"] {
        g.add(Triple::new(Term::security(c), rdf_type.clone(), class.clone()));
    }
    g.add(Triple::new(brute_force.clone(), rdf_type.clone(), threat.clone()));
    g.add(Triple::new(
        brute_force.clone(),
        related_to.clone(),
        Term::string_literal("Multiple failed login attempts"),
    ));
    g.add(Triple::new(malware.clone(), rdf_type.clone(), threat));
    g.add(Triple::new(malware, related_to, Term::string_literal("CVE-2024-1234")));
    g.add(Triple::new(apt29.clone(), rdf_type, Term::security("Actor")));
    g.add(Triple::new(apt29, Term::security("uses"), brute_force));
    g
}
