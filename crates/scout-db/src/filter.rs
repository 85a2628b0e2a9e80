//! Filter compilation for in-process evaluation.
//!
//! A [`CandidateFilter`] is compiled once per query: every `MatchesAny`
//! clause becomes a single case-insensitive alternation of escaped
//! patterns, so user text is always matched literally.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use scout_core::{CandidateFilter, CandidateRecord, Error, FilterClause, FilterField, Result};

/// Maximum number of patterns/values across all clauses. Larger filters
/// match nothing.
const MAX_FILTER_ELEMENTS: usize = 1000;

#[derive(Debug, Clone)]
enum Matcher {
    Experience { min: Option<u32>, max: Option<u32> },
    Substring { field: FilterField, pattern: Regex },
    Member { field: FilterField, values: Vec<String> },
    Nothing,
}

/// A filter ready to test candidate records.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    matchers: Vec<Matcher>,
}

impl CompiledFilter {
    pub fn compile(filter: &CandidateFilter) -> Result<Self> {
        let total_elements: usize = filter
            .clauses()
            .iter()
            .map(|c| match c {
                FilterClause::ExperienceRange { .. } => 0,
                FilterClause::MatchesAny { patterns, .. } => patterns.len(),
                FilterClause::In { values, .. } => values.len(),
            })
            .sum();
        if total_elements > MAX_FILTER_ELEMENTS {
            warn!(
                clause_count = filter.len(),
                total_elements, "Filter too large, matching nothing"
            );
            return Ok(Self {
                matchers: vec![Matcher::Nothing],
            });
        }

        let matchers = filter
            .clauses()
            .iter()
            .map(|clause| {
                Ok(match clause {
                    FilterClause::ExperienceRange { min, max } => Matcher::Experience {
                        min: *min,
                        max: *max,
                    },
                    FilterClause::MatchesAny { field, patterns } => {
                        let alternation = patterns
                            .iter()
                            .map(|p| regex::escape(p))
                            .collect::<Vec<_>>()
                            .join("|");
                        let pattern = RegexBuilder::new(&alternation)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| Error::Store(format!("invalid filter pattern: {}", e)))?;
                        Matcher::Substring {
                            field: *field,
                            pattern,
                        }
                    }
                    FilterClause::In { field, values } => Matcher::Member {
                        field: *field,
                        values: values.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { matchers })
    }

    /// True when the record satisfies every clause. An empty filter matches
    /// everything.
    pub fn matches(&self, record: &CandidateRecord) -> bool {
        self.matchers.iter().all(|m| match m {
            Matcher::Experience { min, max } => {
                let Some(years) = record.query_tags.min_experience_years else {
                    return false;
                };
                min.map_or(true, |min| years >= min) && max.map_or(true, |max| years <= max)
            }
            Matcher::Substring { field, pattern } => {
                field_values(record, *field).iter().any(|v| pattern.is_match(v))
            }
            Matcher::Member { field, values } => field_values(record, *field)
                .iter()
                .any(|v| values.iter().any(|want| want == v.trim())),
            Matcher::Nothing => false,
        })
    }
}

fn field_values(record: &CandidateRecord, field: FilterField) -> Vec<String> {
    let tags = &record.query_tags;
    match field {
        FilterField::Positions => tags.positions.clone(),
        FilterField::Skills => tags.skills_normalized.clone(),
        FilterField::Location => tags.location.iter().cloned().collect(),
        FilterField::Certifications => tags.certifications.clone(),
        FilterField::Degrees => tags.degrees.clone(),
        FilterField::DesignCategory => tags.design_category.iter().cloned().collect(),
        FilterField::PreviousCompanies => record.previous_companies(),
    }
}
