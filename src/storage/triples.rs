//! SQLite-backed triple store for the knowledge graph.
//! Terms are stored as (kind, value, datatype) columns; duplicates are ignored.

use crate::knowledge::{KnowledgeGraph, Term, Triple};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("unknown term kind '{0}'")]
    TermKind(String),
}

const IRI: &str = "iri";
const LITERAL: &str = "literal";

fn split_term(t: &Term) -> (&'static str, &str, &str) {
    match t {
        Term::Iri { value } => (IRI, value, ""),
        Term::Literal { value, datatype } => (LITERAL, value, datatype.as_deref().unwrap_or("")),
    }
}

fn join_term(kind: &str, value: String, datatype: String) -> Result<Term, StoreError> {
    match kind {
        IRI => Ok(Term::Iri { value }),
        LITERAL => Ok(Term::Literal {
            value,
            datatype: Some(datatype).filter(|d| !d.is_empty()),
        }),
        other => Err(StoreError::TermKind(other.to_string())),
    }
}

pub struct TripleStore {
    conn: Mutex<Connection>,
}

impl TripleStore {
    /// Open or create DB at path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS triples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                s_kind TEXT NOT NULL, s_value TEXT NOT NULL, s_dt TEXT NOT NULL,
                p_kind TEXT NOT NULL, p_value TEXT NOT NULL, p_dt TEXT NOT NULL,
                o_kind TEXT NOT NULL, o_value TEXT NOT NULL, o_dt TEXT NOT NULL,
                UNIQUE (s_kind, s_value, s_dt, p_kind, p_value, p_dt, o_kind, o_value, o_dt)
            );
            CREATE INDEX IF NOT EXISTS idx_triples_sp ON triples(s_value, p_value);
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert a triple; returns false if it was already stored
    pub fn insert(&self, triple: &Triple) -> Result<bool, StoreError> {
        let (sk, sv, sd) = split_term(&triple.subject);
        let (pk, pv, pd) = split_term(&triple.predicate);
        let (ok, ov, od) = split_term(&triple.object);
        let n = self.conn()?.execute(
            "INSERT OR IGNORE INTO triples (s_kind, s_value, s_dt, p_kind, p_value, p_dt, o_kind, o_value, o_dt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![sk, sv, sd, pk, pv, pd, ok, ov, od],
        )?;
        Ok(n > 0)
    }

    /// Insert every triple of a graph in one transaction; returns the number newly stored
    pub fn insert_graph(&self, graph: &KnowledgeGraph) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO triples (s_kind, s_value, s_dt, p_kind, p_value, p_dt, o_kind, o_value, o_dt)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for t in graph.triples() {
                let (sk, sv, sd) = split_term(&t.subject);
                let (pk, pv, pd) = split_term(&t.predicate);
                let (ok, ov, od) = split_term(&t.object);
                added += stmt.execute(params![sk, sv, sd, pk, pv, pd, ok, ov, od])?;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    /// Objects matching `(subject, predicate, ?o)` in insertion order
    pub fn objects(&self, subject: &Term, predicate: &Term) -> Result<Vec<Term>, StoreError> {
        let (sk, sv, sd) = split_term(subject);
        let (pk, pv, pd) = split_term(predicate);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT o_kind, o_value, o_dt FROM triples
             WHERE s_kind = ?1 AND s_value = ?2 AND s_dt = ?3 AND p_kind = ?4 AND p_value = ?5 AND p_dt = ?6
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![sk, sv, sd, pk, pv, pd], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (k, v, d) = row?;
            out.push(join_term(&k, v, d)?);
        }
        Ok(out)
    }

    /// Whole store as a graph, in insertion order
    pub fn all(&self) -> Result<KnowledgeGraph, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s_kind, s_value, s_dt, p_kind, p_value, p_dt, o_kind, o_value, o_dt FROM triples ORDER BY id",
        )?;
        let mut rows = stmt.query([])?;
        let mut graph = KnowledgeGraph::new();
        while let Some(row) = rows.next()? {
            let subject = join_term(&row.get::<_, String>(0)?, row.get(1)?, row.get(2)?)?;
            let predicate = join_term(&row.get::<_, String>(3)?, row.get(4)?, row.get(5)?)?;
            let object = join_term(&row.get::<_, String>(6)?, row.get(7)?, row.get(8)?)?;
            graph.add(Triple::new(subject, predicate, object));
        }
        Ok(graph)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let n: Option<i64> = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM triples", [], |r| r.get(0))
            .optional()?;
        Ok(n.unwrap_or(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Remove every triple; returns the number deleted
    pub fn clear(&self) -> Result<usize, StoreError> {
        Ok(self.conn()?.execute("DELETE FROM triples", [])?)
    }
}
