//! Turtle serialization with prefixed names, grouped by subject.

use super::{Term, Triple, RDF_TYPE, SECURITY_NS};
use std::collections::BTreeMap;
use std::fmt::Write;

const PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("so", SECURITY_NS),
];

fn is_pn_local(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn iri(value: &str) -> String {
    if value == RDF_TYPE {
        return "a".to_string();
    }
    for (prefix, ns) in PREFIXES {
        if let Some(local) = value.strip_prefix(ns) {
            if is_pn_local(local) {
                return format!("{prefix}:{local}");
            }
        }
    }
    format!("<{value}>")
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn term(t: &Term) -> String {
    match t {
        Term::Iri { value } => iri(value),
        Term::Literal { value, datatype } => match datatype {
            Some(dt) => format!("\"{}\"^^{}", escape(value), iri(dt)),
            None => format!("\"{}\"", escape(value)),
        },
    }
}

/// Serialize triples; subjects and predicates are sorted for stable output.
pub fn to_turtle(triples: &[Triple]) -> String {
    let mut by_subject: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for t in triples {
        by_subject
            .entry(term(&t.subject))
            .or_default()
            .entry(term(&t.predicate))
            .or_default()
            .push(term(&t.object));
    }

    let mut out = String::new();
    for (prefix, ns) in PREFIXES {
        let _ = writeln!(out, "@prefix {prefix}: <{ns}> .");
    }
    for (subject, preds) in by_subject {
        let _ = writeln!(out);
        let body: Vec<String> = preds
            .into_iter()
            .map(|(p, objs)| format!("{p} {}", objs.join(",\n        ")))
            .collect();
        let _ = writeln!(out, "{subject} {} .", body.join(" ;\n    "));
    }
    out
}
