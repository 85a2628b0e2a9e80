//! Structural candidate filter passed to the candidate store.
//!
//! Clauses are AND-ed. Each clause constrains one candidate field:
//!
//! - **ExperienceRange**: inclusive bounds on `query_tags.min_experience_years`
//! - **MatchesAny**: case-insensitive substring match of any pattern
//! - **In**: exact membership of any value
//!
//! The store owns how a filter is executed; this module only describes it.
//!
//! # Example
//!
//! ```
//! use scout_core::{CandidateFilter, FilterField};
//!
//! let filter = CandidateFilter::new()
//!     .with_experience_range(Some(3), None)
//!     .with_any(FilterField::Location, ["上海"]);
//!
//! assert_eq!(filter.len(), 2);
//! assert!(!filter.is_empty());
//! ```

use serde::{Deserialize, Serialize};

/// Candidate field a clause applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// `query_tags.positions`
    Positions,
    /// `query_tags.skills_normalized`
    Skills,
    /// `query_tags.location`
    Location,
    /// `query_tags.certifications`
    Certifications,
    /// `query_tags.degrees`
    Degrees,
    /// `query_tags.design_category`
    DesignCategory,
    /// `extracted_info.experience[].company`
    PreviousCompanies,
}

/// One filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterClause {
    ExperienceRange { min: Option<u32>, max: Option<u32> },
    MatchesAny { field: FilterField, patterns: Vec<String> },
    In { field: FilterField, values: Vec<String> },
}

/// Conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateFilter {
    clauses: Vec<FilterClause>,
}

impl CandidateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an experience range; ignored when both bounds are absent.
    pub fn with_experience_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        if min.is_some() || max.is_some() {
            self.clauses.push(FilterClause::ExperienceRange { min, max });
        }
        self
    }

    /// Add a substring any-of clause; ignored when no pattern is non-blank.
    pub fn with_any<I, S>(mut self, field: FilterField, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = non_blank(patterns);
        if !patterns.is_empty() {
            self.clauses
                .push(FilterClause::MatchesAny { field, patterns });
        }
        self
    }

    /// Add a membership clause; ignored when no value is non-blank.
    pub fn with_in<I, S>(mut self, field: FilterField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = non_blank(values);
        if !values.is_empty() {
            self.clauses.push(FilterClause::In { field, values });
        }
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// An empty filter cannot express a valid search.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn has_field(&self, field: FilterField) -> bool {
        self.clauses.iter().any(|c| match c {
            FilterClause::MatchesAny { field: f, .. } | FilterClause::In { field: f, .. } => {
                *f == field
            }
            FilterClause::ExperienceRange { .. } => false,
        })
    }
}

fn non_blank<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item: String = item.into();
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}
