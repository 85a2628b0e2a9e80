//! Synonym groups used to widen store filters.

use std::collections::BTreeSet;

/// Groups of interchangeable terms, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    groups: Vec<BTreeSet<String>>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default skill groups.
    pub fn skills() -> Self {
        Self::new().with_group(&["cad", "autocad", "cad制图"])
    }

    /// Default education-level groups.
    pub fn education() -> Self {
        Self::new()
            .with_group(&["本科", "学士"])
            .with_group(&["硕士", "研究生"])
    }

    pub fn with_group(mut self, terms: &[&str]) -> Self {
        self.groups
            .push(terms.iter().map(|t| normalize(t)).collect());
        self
    }

    /// Normalized terms plus every synonym of each.
    pub fn expand<'a, I>(&self, terms: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut out = BTreeSet::new();
        for term in terms {
            let term = normalize(term);
            if term.is_empty() {
                continue;
            }
            if let Some(group) = self.groups.iter().find(|g| g.contains(&term)) {
                out.extend(group.iter().cloned());
            }
            out.insert(term);
        }
        out
    }
}

fn normalize(term: &str) -> String {
    term.trim().to_lowercase()
}
