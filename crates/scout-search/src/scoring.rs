//! Multi-strategy dimension scoring.
//!
//! Each [`Dimension`] compares one required value against one candidate
//! value with a scoring logic and scales the raw result by its weight:
//!
//! | Logic | Raw score |
//! |-------|-----------|
//! | `range_match` | base at equality, linear bonus above, two-rate decay below |
//! | `keyword_overlap` | matches x per-match, capped at \|required\| x per-match |
//! | `exact_match` | match / mismatch score |
//! | `keyword_presence` | matches x per-match, capped at 1.0 |
//!
//! A dimension that fails (type mismatch, non-finite result) contributes 0
//! and is logged with its name; the candidate's other dimensions still count.

use std::collections::BTreeSet;

use serde::Deserialize;
use thiserror::Error;
use tracing::{trace, warn};

use scout_core::{defaults, CandidateRecord};

use crate::criteria::ResolvedCriteria;
use crate::fields::{CandidateField, FieldValue, RequiredField};

/// Failure of a single dimension for a single candidate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("non-finite score")]
    NonFinite,
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Parameters of `range_match`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RangeMatchParams {
    #[serde(alias = "exact_match_score")]
    pub base_score: f64,
    #[serde(alias = "tolerance_years")]
    pub tolerance: f64,
    #[serde(alias = "score_decay_rate")]
    pub decay_rate: f64,
    pub min_score: f64,
    #[serde(alias = "bonus_rate_per_year")]
    pub bonus_rate: f64,
    pub beyond_tolerance_multiplier: f64,
}

impl Default for RangeMatchParams {
    fn default() -> Self {
        Self {
            base_score: defaults::RANGE_BASE_SCORE,
            tolerance: defaults::RANGE_TOLERANCE,
            decay_rate: defaults::RANGE_DECAY_RATE,
            min_score: defaults::RANGE_MIN_SCORE,
            bonus_rate: defaults::RANGE_BONUS_RATE,
            beyond_tolerance_multiplier: defaults::RANGE_BEYOND_TOLERANCE_MULTIPLIER,
        }
    }
}

/// Parameters of `keyword_overlap`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeywordOverlapParams {
    pub score_per_match: f64,
    /// Defaults to `|required| * score_per_match`.
    pub max_score: Option<f64>,
}

impl Default for KeywordOverlapParams {
    fn default() -> Self {
        Self {
            score_per_match: defaults::KEYWORD_SCORE_PER_MATCH,
            max_score: None,
        }
    }
}

/// Parameters of `exact_match`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExactMatchParams {
    pub match_score: f64,
    pub mismatch_score: f64,
    pub case_sensitive: bool,
}

impl Default for ExactMatchParams {
    fn default() -> Self {
        Self {
            match_score: defaults::EXACT_MATCH_SCORE,
            mismatch_score: defaults::EXACT_MISMATCH_SCORE,
            case_sensitive: false,
        }
    }
}

/// Parameters of `keyword_presence`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeywordPresenceParams {
    pub score_per_match: f64,
    pub max_score: f64,
}

impl Default for KeywordPresenceParams {
    fn default() -> Self {
        Self {
            score_per_match: defaults::KEYWORD_SCORE_PER_MATCH,
            max_score: defaults::KEYWORD_PRESENCE_MAX_SCORE,
        }
    }
}

// =============================================================================
// SCORING FUNCTIONS
// =============================================================================

fn numeric(value: &FieldValue) -> Result<Option<f64>, ScoringError> {
    match value {
        FieldValue::Absent => Ok(None),
        FieldValue::Number(n) => Ok(Some(*n)),
        FieldValue::Text(s) => Ok(s.trim().parse::<f64>().ok()),
        FieldValue::List(_) => Err(ScoringError::TypeMismatch {
            expected: "number",
            found: "list",
        }),
    }
}

fn keywords(value: &FieldValue) -> Result<BTreeSet<String>, ScoringError> {
    let normalize = |s: &String| s.trim().to_lowercase();
    match value {
        FieldValue::Absent => Ok(BTreeSet::new()),
        FieldValue::Text(s) => Ok(BTreeSet::from([normalize(s)])),
        FieldValue::List(items) => Ok(items
            .iter()
            .map(normalize)
            .filter(|s| !s.is_empty())
            .collect()),
        FieldValue::Number(_) => Err(ScoringError::TypeMismatch {
            expected: "keywords",
            found: "number",
        }),
    }
}

fn scalar_text(value: &FieldValue) -> Result<Option<String>, ScoringError> {
    match value {
        FieldValue::Absent => Ok(None),
        FieldValue::Text(s) => Ok(Some(s.clone())),
        FieldValue::Number(n) => Ok(Some(n.to_string())),
        FieldValue::List(_) => Err(ScoringError::TypeMismatch {
            expected: "single value",
            found: "list",
        }),
    }
}

/// Numeric proximity: equality scores `base`, surplus earns an uncapped
/// bonus, shortfall decays gently within `tolerance` and
/// `beyond_tolerance_multiplier` times faster past it.
pub fn range_match(
    required: &FieldValue,
    candidate: &FieldValue,
    p: &RangeMatchParams,
) -> Result<f64, ScoringError> {
    let (Some(req), Some(cand)) = (numeric(required)?, numeric(candidate)?) else {
        return Ok(p.min_score);
    };

    if cand >= req {
        return Ok(p.base_score + (cand - req) * p.bonus_rate * p.base_score);
    }

    let shortfall = req - cand;
    if shortfall <= p.tolerance {
        return Ok((p.base_score - shortfall * p.decay_rate * p.base_score).max(p.min_score));
    }

    let at_edge = p.base_score - p.tolerance * p.decay_rate * p.base_score;
    let beyond = shortfall - p.tolerance;
    let score =
        at_edge - beyond * p.decay_rate * p.beyond_tolerance_multiplier * p.base_score;
    Ok(score.max(p.min_score))
}

/// Case-insensitive set overlap. Nothing required scores `max_score` when
/// configured, else 1.0.
pub fn keyword_overlap(
    required: &FieldValue,
    candidate: &FieldValue,
    p: &KeywordOverlapParams,
) -> Result<f64, ScoringError> {
    let required = keywords(required)?;
    if required.is_empty() {
        return Ok(p.max_score.unwrap_or(defaults::KEYWORD_FULL_SCORE));
    }
    let candidate = keywords(candidate)?;
    if candidate.is_empty() {
        return Ok(0.0);
    }
    let matches = required.intersection(&candidate).count() as f64;
    let max_score = p
        .max_score
        .unwrap_or(required.len() as f64 * p.score_per_match);
    Ok((matches * p.score_per_match).min(max_score))
}

/// Equality of a single required value. A list-valued candidate matches
/// when any element does.
pub fn exact_match(
    required: &FieldValue,
    candidate: &FieldValue,
    p: &ExactMatchParams,
) -> Result<f64, ScoringError> {
    let Some(required) = scalar_text(required)? else {
        return Ok(p.match_score);
    };
    let fold = |s: &str| {
        let s = s.trim();
        if p.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    let required = fold(&required);

    let matched = match candidate {
        FieldValue::Absent => false,
        FieldValue::List(items) => items.iter().any(|item| fold(item) == required),
        other => scalar_text(other)?.is_some_and(|c| fold(&c) == required),
    };
    Ok(if matched {
        p.match_score
    } else {
        p.mismatch_score
    })
}

/// Case-insensitive presence of required keywords, capped at `max_score`.
pub fn keyword_presence(
    required: &FieldValue,
    candidate: &FieldValue,
    p: &KeywordPresenceParams,
) -> Result<f64, ScoringError> {
    let required = keywords(required)?;
    if required.is_empty() {
        return Ok(p.max_score);
    }
    let candidate = keywords(candidate)?;
    if candidate.is_empty() {
        return Ok(0.0);
    }
    let matches = required.intersection(&candidate).count() as f64;
    Ok((matches * p.score_per_match).min(p.max_score))
}

// =============================================================================
// DIMENSIONS
// =============================================================================

/// Scoring logic of a dimension with its parsed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringLogic {
    RangeMatch(RangeMatchParams),
    KeywordOverlap(KeywordOverlapParams),
    ExactMatch(ExactMatchParams),
    KeywordPresence(KeywordPresenceParams),
    /// Logic type this crate does not implement; contributes 0.
    Unsupported { logic_type: String },
    /// Logic whose configuration could not be used; contributes 0.
    Invalid { reason: String },
}

impl ScoringLogic {
    /// Build from a logic type name and its params object.
    pub fn from_config(logic_type: &str, params: serde_json::Value) -> Self {
        fn parse<T: serde::de::DeserializeOwned>(
            params: serde_json::Value,
            wrap: fn(T) -> ScoringLogic,
        ) -> ScoringLogic {
            let params = match params {
                serde_json::Value::Null => serde_json::Value::Object(Default::default()),
                other => other,
            };
            match serde_json::from_value::<T>(params) {
                Ok(p) => wrap(p),
                Err(e) => ScoringLogic::Invalid {
                    reason: format!("invalid params: {}", e),
                },
            }
        }

        match logic_type {
            "range_match" => parse(params, Self::RangeMatch),
            "keyword_overlap" => parse(params, Self::KeywordOverlap),
            "exact_match" => parse(params, Self::ExactMatch),
            "keyword_presence" => parse(params, Self::KeywordPresence),
            other => Self::Unsupported {
                logic_type: other.to_string(),
            },
        }
    }

    /// Raw score, or `None` when the logic cannot score at all.
    fn apply(
        &self,
        required: &FieldValue,
        candidate: &FieldValue,
    ) -> Option<Result<f64, ScoringError>> {
        Some(match self {
            Self::RangeMatch(p) => range_match(required, candidate, p),
            Self::KeywordOverlap(p) => keyword_overlap(required, candidate, p),
            Self::ExactMatch(p) => exact_match(required, candidate, p),
            Self::KeywordPresence(p) => keyword_presence(required, candidate, p),
            Self::Unsupported { .. } | Self::Invalid { .. } => return None,
        })
    }
}

/// One weighted scoring axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub enabled: bool,
    /// Maximum nominal contribution; raw scores are multiplied by it.
    pub weight: f64,
    pub logic: ScoringLogic,
    /// `None` when the configured path is unknown; reads as absent.
    pub required: Option<RequiredField>,
    /// `None` when the configured path is unknown; reads as absent.
    pub candidate: Option<CandidateField>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, weight: f64, logic: ScoringLogic) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            weight,
            logic,
            required: None,
            candidate: None,
        }
    }

    pub fn with_fields(mut self, required: RequiredField, candidate: CandidateField) -> Self {
        self.required = Some(required);
        self.candidate = Some(candidate);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Weighted contribution for one candidate. Never fails: disabled,
    /// unscorable and failing dimensions contribute 0.
    pub fn score(&self, resolved: &ResolvedCriteria, record: &CandidateRecord) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let required = self
            .required
            .map_or(FieldValue::Absent, |f| f.read(resolved));
        let candidate = self
            .candidate
            .map_or(FieldValue::Absent, |f| f.read(record));

        let Some(raw) = self.logic.apply(&required, &candidate) else {
            trace!(dimension = %self.name, "Dimension cannot score, contributing 0");
            return 0.0;
        };

        match raw.and_then(|raw| {
            let weighted = raw * self.weight;
            if weighted.is_finite() {
                Ok(weighted)
            } else {
                Err(ScoringError::NonFinite)
            }
        }) {
            Ok(score) => {
                trace!(
                    dimension = %self.name,
                    candidate_id = %record.id,
                    score,
                    "Dimension scored"
                );
                score
            }
            Err(e) => {
                warn!(
                    dimension = %self.name,
                    candidate_id = %record.id,
                    required = required.kind(),
                    candidate = candidate.kind(),
                    error = %e,
                    "Dimension scoring failed, contributing 0"
                );
                0.0
            }
        }
    }
}

/// Sums dimension contributions for a candidate.
#[derive(Debug, Clone, Copy)]
pub struct DimensionScorer<'a> {
    dimensions: &'a [Dimension],
}

impl<'a> DimensionScorer<'a> {
    pub fn new(dimensions: &'a [Dimension]) -> Self {
        Self { dimensions }
    }

    /// Aggregate score: sum of every enabled dimension's contribution.
    pub fn score(&self, resolved: &ResolvedCriteria, record: &CandidateRecord) -> f64 {
        self.dimensions
            .iter()
            .map(|d| d.score(resolved, record))
            .sum()
    }

    /// Per-dimension contributions, in rule-set order.
    pub fn breakdown(
        &self,
        resolved: &ResolvedCriteria,
        record: &CandidateRecord,
    ) -> Vec<(&'a str, f64)> {
        self.dimensions
            .iter()
            .map(|d| (d.name.as_str(), d.score(resolved, record)))
            .collect()
    }
}
