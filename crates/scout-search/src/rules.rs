//! Scoring rule set loading and validation.
//!
//! A rule set document (YAML or JSON) looks like:
//!
//! ```yaml
//! scoring_rules:
//!   initial_candidate_pool_size: 30
//!   dimensions:
//!     experience:
//!       enabled: true
//!       weight: 30
//!       logic:
//!         type: range_match
//!         required_value_path: query.criteria.experience_years_min
//!         candidate_value_path: candidate.query_tags.min_experience_years
//!         params:
//!           tolerance_years: 1
//! ```
//!
//! The `scoring_rules` wrapper is optional. Structural problems (missing or
//! non-positive pool size, `dimensions` not a map) reject the whole document;
//! callers then rank unscored. Problems inside one dimension only disable
//! that dimension.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use scout_core::{Error, Result};

use crate::fields::{CandidateField, RequiredField};
use crate::scoring::{Dimension, ScoringLogic};

const ROOT_KEY: &str = "scoring_rules";

#[derive(Deserialize)]
struct RawDimension {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    weight: f64,
    #[serde(default)]
    logic: Option<RawLogic>,
}

#[derive(Deserialize)]
struct RawLogic {
    #[serde(rename = "type")]
    logic_type: String,
    #[serde(default)]
    required_value_path: Option<String>,
    #[serde(default)]
    candidate_value_path: Option<String>,
    #[serde(default)]
    params: JsonValue,
}

/// Validated, read-only scoring configuration for ranking requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRuleSet {
    /// Candidates fetched per new query.
    pub initial_pool_size: usize,
    /// Dimensions ordered by name.
    pub dimensions: Vec<Dimension>,
}

impl ScoringRuleSet {
    pub fn new(initial_pool_size: usize, dimensions: Vec<Dimension>) -> Self {
        Self {
            initial_pool_size: initial_pool_size.max(1),
            dimensions,
        }
    }

    /// Build from an already-parsed document.
    pub fn from_value(document: JsonValue) -> Result<Self> {
        let root = match document.get(ROOT_KEY) {
            Some(inner) => inner,
            None => &document,
        };
        if root.is_null() {
            return Err(Error::Config("scoring rules section is empty".into()));
        }

        let initial_pool_size = root
            .get("initial_candidate_pool_size")
            .and_then(JsonValue::as_u64)
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                Error::Config("initial_candidate_pool_size must be a positive integer".into())
            })?;
        let initial_pool_size = usize::try_from(initial_pool_size)
            .map_err(|_| Error::Config("initial_candidate_pool_size is too large".into()))?;

        let dimensions = root
            .get("dimensions")
            .and_then(JsonValue::as_object)
            .ok_or_else(|| Error::Config("dimensions must be a map".into()))?;

        let dimensions: Vec<Dimension> = dimensions
            .iter()
            .map(|(name, raw)| build_dimension(name, raw))
            .collect();

        debug!(
            pool_size = initial_pool_size,
            dimensions = dimensions.len(),
            enabled = dimensions.iter().filter(|d| d.enabled).count(),
            "Scoring rules loaded"
        );

        Ok(Self {
            initial_pool_size,
            dimensions,
        })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let document: JsonValue = serde_yaml::from_str(source)?;
        Self::from_value(document)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let document: JsonValue = serde_json::from_str(source)?;
        Self::from_value(document)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let rules = if is_json {
            Self::from_json_str(&source)?
        } else {
            Self::from_yaml_str(&source)?
        };
        info!(
            path = %path.display(),
            dimensions = rules.dimensions.len(),
            "Scoring rules file loaded"
        );
        Ok(rules)
    }

    /// Load, logging and discarding any error so ranking degrades to unscored.
    pub fn load_or_warn(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(rules) => Some(rules),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Scoring rules unavailable, ranking will be unscored"
                );
                None
            }
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

fn build_dimension(name: &str, raw: &JsonValue) -> Dimension {
    let invalid = |reason: String| {
        warn!(dimension = name, reason = %reason, "Scoring dimension disabled");
        Dimension {
            name: name.to_string(),
            enabled: false,
            weight: 0.0,
            logic: ScoringLogic::Invalid { reason },
            required: None,
            candidate: None,
        }
    };

    let raw: RawDimension = match serde_json::from_value(raw.clone()) {
        Ok(raw) => raw,
        Err(e) => return invalid(format!("malformed dimension: {}", e)),
    };
    if !raw.weight.is_finite() || raw.weight < 0.0 {
        return invalid(format!("weight must be a non-negative number, got {}", raw.weight));
    }
    let Some(logic) = raw.logic else {
        return invalid("no logic configured".to_string());
    };

    let scoring = ScoringLogic::from_config(&logic.logic_type, logic.params);
    match &scoring {
        ScoringLogic::Unsupported { logic_type } => {
            warn!(dimension = name, logic_type = %logic_type, "Unknown scoring logic, dimension contributes 0");
        }
        ScoringLogic::Invalid { reason } => {
            warn!(dimension = name, reason = %reason, "Invalid scoring params, dimension contributes 0");
        }
        _ => {}
    }

    let required = logic
        .required_value_path
        .as_deref()
        .and_then(|path| resolve_path(name, path, RequiredField::from_path));
    let candidate = logic
        .candidate_value_path
        .as_deref()
        .and_then(|path| resolve_path(name, path, CandidateField::from_path));

    Dimension {
        name: name.to_string(),
        enabled: raw.enabled,
        weight: raw.weight,
        logic: scoring,
        required,
        candidate,
    }
}

fn resolve_path<T>(dimension: &str, path: &str, resolve: fn(&str) -> Option<T>) -> Option<T> {
    let resolved = resolve(path);
    if resolved.is_none() {
        warn!(dimension, path, "Unknown value path, reads as absent");
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RangeMatchParams;

    const RULES_YAML: &str = r#"
scoring_rules:
  initial_candidate_pool_size: 30
  dimensions:
    experience:
      enabled: true
      weight: 30
      logic:
        type: range_match
        required_value_path: query.criteria.experience_years_min
        candidate_value_path: candidate.query_tags.min_experience_years
        params:
          tolerance_years: 1
    skills:
      enabled: true
      weight: 25
      logic:
        type: keyword_overlap
        required_value_path: query.criteria.skills
        candidate_value_path: candidate.query_tags.skills_normalized
    certifications:
      enabled: true
      weight: 20
      logic:
        type: keyword_presence
        required_value_path: query.criteria.certifications
        candidate_value_path: candidate.query_tags.certifications
    location:
      weight: 10
      logic:
        type: exact_match
        required_value_path: query.criteria.location
        candidate_value_path: candidate.query_tags.location
"#;

    #[test]
    fn test_load_yaml_document() {
        let rules = ScoringRuleSet::from_yaml_str(RULES_YAML).unwrap();
        assert_eq!(rules.initial_pool_size, 30);
        assert_eq!(rules.dimensions.len(), 4);

        let experience = rules.dimension("experience").unwrap();
        assert!(experience.enabled);
        assert_eq!(experience.weight, 30.0);
        assert_eq!(experience.required, Some(RequiredField::ExperienceYearsMin));
        assert_eq!(
            experience.candidate,
            Some(CandidateField::MinExperienceYears)
        );
        assert_eq!(
            experience.logic,
            ScoringLogic::RangeMatch(RangeMatchParams {
                tolerance: 1.0,
                ..Default::default()
            })
        );

        // `enabled` defaults to false.
        assert!(!rules.dimension("location").unwrap().enabled);
    }

    #[test]
    fn test_bare_json_document() {
        let rules = ScoringRuleSet::from_json_str(
            r#"{"initial_candidate_pool_size": 12, "dimensions": {}}"#,
        )
        .unwrap();
        assert_eq!(rules.initial_pool_size, 12);
        assert!(rules.dimensions.is_empty());
    }

    #[test]
    fn test_structural_errors_reject_document() {
        for doc in [
            r#"{"scoring_rules": {"dimensions": {}}}"#,
            r#"{"scoring_rules": {"initial_candidate_pool_size": 0, "dimensions": {}}}"#,
            r#"{"scoring_rules": {"initial_candidate_pool_size": "30", "dimensions": {}}}"#,
            r#"{"scoring_rules": {"initial_candidate_pool_size": 30, "dimensions": []}}"#,
            r#"{"scoring_rules": null}"#,
        ] {
            let err = ScoringRuleSet::from_json_str(doc).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{}", doc);
        }
    }

    #[test]
    fn test_bad_dimension_is_disabled_not_fatal() {
        let rules = ScoringRuleSet::from_json_str(
            r#"{"initial_candidate_pool_size": 10, "dimensions": {
                "negative": {"enabled": true, "weight": -5,
                             "logic": {"type": "exact_match"}},
                "no_logic": {"enabled": true, "weight": 5},
                "mystery": {"enabled": true, "weight": 5,
                            "logic": {"type": "semantic_similarity",
                                      "required_value_path": "query.criteria.salary"}}
            }}"#,
        )
        .unwrap();

        assert!(!rules.dimension("negative").unwrap().enabled);
        assert!(!rules.dimension("no_logic").unwrap().enabled);

        let mystery = rules.dimension("mystery").unwrap();
        assert!(mystery.enabled);
        assert!(matches!(mystery.logic, ScoringLogic::Unsupported { .. }));
        assert!(mystery.required.is_none());
    }

    #[test]
    fn test_load_or_warn_missing_file() {
        assert!(ScoringRuleSet::load_or_warn("/nonexistent/scoring.yaml").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("scout-rules-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rules.yaml");
        std::fs::write(&path, RULES_YAML).unwrap();

        let rules = ScoringRuleSet::load(&path).unwrap();
        assert_eq!(rules.dimensions.len(), 4);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
