//! Criteria expansion: certificate variants, synonyms, and the store filter.
//!
//! Certification requirements are expanded through [`LevelResolver`] once per
//! query. The same expanded set drives both the structural store filter and
//! the certification scoring dimension, so retrieval and ranking agree on
//! which certificates satisfy a requirement.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use scout_core::{CandidateFilter, FilterField, QueryCriteria};

use crate::levels::{LevelResolver, GENERIC_TITLE};
use crate::synonyms::SynonymTable;

/// Parsed criteria plus everything derived from them for one query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedCriteria {
    pub criteria: QueryCriteria,
    /// Certificate names (or bare level keywords) satisfying any
    /// certification requirement.
    pub certificate_variants: BTreeSet<String>,
    /// Skills widened by synonym groups (filter only).
    pub expanded_skills: BTreeSet<String>,
    /// Education levels widened by synonym groups (filter only).
    pub expanded_education: BTreeSet<String>,
}

impl ResolvedCriteria {
    /// Structural store filter for these criteria.
    ///
    /// Position is not filtered on; it only feeds scoring. An empty result
    /// means the criteria cannot express a valid search.
    pub fn to_filter(&self) -> CandidateFilter {
        let c = &self.criteria;
        let filter = CandidateFilter::new()
            .with_experience_range(c.experience_years_min, c.experience_years_max)
            .with_any(FilterField::Skills, self.expanded_skills.iter().cloned())
            .with_any(FilterField::Location, c.location.iter().cloned())
            .with_in(FilterField::Degrees, self.expanded_education.iter().cloned())
            .with_any(
                FilterField::PreviousCompanies,
                c.previous_companies.iter().cloned(),
            )
            .with_any(
                FilterField::Certifications,
                self.certificate_variants.iter().cloned(),
            )
            .with_any(FilterField::DesignCategory, c.design_category.iter().cloned());

        debug!(clause_count = filter.len(), "Built candidate filter");
        filter
    }
}

/// Expands parsed criteria using a level resolver and synonym tables.
#[derive(Debug, Clone)]
pub struct CriteriaExpander {
    resolver: Arc<LevelResolver>,
    skills: SynonymTable,
    education: SynonymTable,
}

impl Default for CriteriaExpander {
    fn default() -> Self {
        Self::new(Arc::new(LevelResolver::builtin()))
    }
}

impl CriteriaExpander {
    pub fn new(resolver: Arc<LevelResolver>) -> Self {
        Self {
            resolver,
            skills: SynonymTable::skills(),
            education: SynonymTable::education(),
        }
    }

    pub fn with_skill_synonyms(mut self, table: SynonymTable) -> Self {
        self.skills = table;
        self
    }

    pub fn with_education_synonyms(mut self, table: SynonymTable) -> Self {
        self.education = table;
        self
    }

    pub fn resolver(&self) -> &LevelResolver {
        &self.resolver
    }

    pub fn expand(&self, criteria: &QueryCriteria) -> ResolvedCriteria {
        let mut certificate_variants = BTreeSet::new();
        for req in &criteria.certifications {
            let base = req.base_name.trim();
            let level = req.level_keyword.as_deref().map(str::trim).filter(|l| !l.is_empty());
            match level {
                Some(level) if base.is_empty() || base == GENERIC_TITLE => {
                    certificate_variants.extend(self.resolver.resolve_bare_level(level, req.modifier));
                }
                _ if base.is_empty() || base == GENERIC_TITLE => {
                    debug!("Skipping certification requirement with no base or level");
                }
                _ => {
                    certificate_variants.extend(self.resolver.resolve(base, level, req.modifier));
                }
            }
        }

        ResolvedCriteria {
            criteria: criteria.clone(),
            certificate_variants,
            expanded_skills: self.skills.expand(&criteria.skills),
            expanded_education: self.education.expand(&criteria.education_levels),
        }
    }

    /// Certificate requirements phrased in a way the resolver does not know.
    ///
    /// Logged for manual review of the level tables; never blocks a search.
    pub fn unrecognized_certifications(&self, criteria: &QueryCriteria) -> Vec<String> {
        let unknown: Vec<String> = criteria
            .certifications
            .iter()
            .filter(|req| {
                let base = req.base_name.trim();
                !base.is_empty() && base != GENERIC_TITLE
            })
            .map(|req| req.full_name())
            .filter(|name| !self.resolver.exists(name))
            .collect();
        for name in &unknown {
            warn!(certificate = %name, "Unrecognized certificate phrasing, flagged for review");
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{CertificationRequirement, FilterClause, LevelModifier};

    fn criteria_with_certs(certs: Vec<CertificationRequirement>) -> QueryCriteria {
        QueryCriteria {
            certifications: certs,
            ..Default::default()
        }
    }

    #[test]
    fn test_certifications_expand_through_resolver() {
        let expander = CriteriaExpander::default();
        let resolved = expander.expand(&criteria_with_certs(vec![
            CertificationRequirement::new("工程师").with_level("高级", LevelModifier::Ge)
        ]));
        assert!(resolved.certificate_variants.contains("高级工程师"));
        assert!(resolved.certificate_variants.contains("教授级高级工程师"));
        assert!(!resolved.certificate_variants.contains("中级工程师"));
    }

    #[test]
    fn test_bare_title_uses_level_keywords_only() {
        let expander = CriteriaExpander::default();
        let resolved = expander.expand(&criteria_with_certs(vec![
            CertificationRequirement::new(GENERIC_TITLE).with_level("中级", LevelModifier::Ge),
            CertificationRequirement::new("").with_level("二级", LevelModifier::Eq),
        ]));
        let expected: BTreeSet<String> =
            ["中级", "高级", "二级"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolved.certificate_variants, expected);
    }

    #[test]
    fn test_filter_clauses() {
        let expander = CriteriaExpander::default();
        let criteria = QueryCriteria {
            experience_years_min: Some(5),
            skills: ["CAD".to_string()].into_iter().collect(),
            location: Some("上海".to_string()),
            education_levels: ["本科".to_string()].into_iter().collect(),
            design_category: Some("建筑设计".to_string()),
            position: Some("建筑设计师".to_string()),
            ..Default::default()
        };
        let filter = expander.expand(&criteria).to_filter();

        assert_eq!(filter.len(), 5);
        assert!(filter.clauses().contains(&FilterClause::ExperienceRange {
            min: Some(5),
            max: None
        }));
        assert!(filter.clauses().contains(&FilterClause::In {
            field: FilterField::Degrees,
            values: vec!["学士".to_string(), "本科".to_string()],
        }));
        assert!(!filter.has_field(FilterField::Positions));
    }

    #[test]
    fn test_position_only_criteria_yield_empty_filter() {
        let expander = CriteriaExpander::default();
        let criteria = QueryCriteria {
            position: Some("结构工程师".to_string()),
            ..Default::default()
        };
        assert!(expander.expand(&criteria).to_filter().is_empty());
    }

    #[test]
    fn test_unrecognized_certifications() {
        let expander = CriteriaExpander::default();
        let criteria = criteria_with_certs(vec![
            CertificationRequirement::new("工程师").with_level("高级", LevelModifier::Eq),
            CertificationRequirement::new("一建证"),
            CertificationRequirement::new(GENERIC_TITLE).with_level("中级", LevelModifier::Ge),
        ]);
        assert_eq!(expander.unrecognized_certifications(&criteria), vec!["一建证"]);
    }
}
