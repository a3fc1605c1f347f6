//! One-hot encoding of a categorical field with the first level dropped.

use crate::config::LevelOrder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Levels of one categorical field. `levels[0]` is the reference level and
/// has no indicator column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OneHot {
    pub field: String,
    pub levels: Vec<String>,
}

impl OneHot {
    /// Collect the distinct values of `values` in the requested order.
    pub fn fit<'a>(field: &str, values: impl IntoIterator<Item = &'a str>, order: LevelOrder) -> Self {
        let mut seen = HashSet::new();
        let mut levels: Vec<String> = values
            .into_iter()
            .filter(|v| seen.insert(*v))
            .map(String::from)
            .collect();
        if order == LevelOrder::Lexicographic {
            levels.sort();
        }
        Self {
            field: field.to_string(),
            levels,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    /// Number of indicator columns
    pub fn width(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Indicator column names, `<field>_<value>`
    pub fn columns(&self) -> Vec<String> {
        self.levels
            .iter()
            .skip(1)
            .map(|l| format!("{}_{}", self.field, l))
            .collect()
    }

    /// 0/1 indicators for a value; all zeros for the reference level or an unseen value.
    pub fn encode(&self, value: &str) -> Vec<u8> {
        self.levels
            .iter()
            .skip(1)
            .map(|l| u8::from(l == value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_drops_first_value() {
        let enc = OneHot::fit("user", ["root", "admin", "root"], LevelOrder::FirstSeen);
        assert_eq!(enc.reference(), Some("root"));
        assert_eq!(enc.columns(), vec!["user_admin"]);
        assert_eq!(enc.encode("admin"), vec![1]);
        assert_eq!(enc.encode("root"), vec![0]);
    }

    #[test]
    fn lexicographic_sorts_bytes() {
        let enc = OneHot::fit("source_ip", ["unknown", "192.168.1.10", "10.0.0.5"], LevelOrder::Lexicographic);
        assert_eq!(enc.levels, vec!["10.0.0.5", "192.168.1.10", "unknown"]);
        assert_eq!(enc.width(), 2);
    }

    #[test]
    fn empty_has_no_columns() {
        let enc = OneHot::fit("user", std::iter::empty(), LevelOrder::FirstSeen);
        assert_eq!(enc.reference(), None);
        assert!(enc.columns().is_empty());
        assert!(enc.encode("x").is_empty());
    }
}
