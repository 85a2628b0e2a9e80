//! # scout-search
//!
//! Candidate scoring and ranking for talentscout.
//!
//! This crate provides:
//! - Certificate and title level resolution (`中级工程师 or higher`)
//! - Synonym expansion and structural store filters built from criteria
//! - Scoring rule sets loaded from YAML/JSON with typed field accessors
//! - Weighted multi-dimension scoring (range, overlap, exact, presence)
//! - A ranking pipeline that sorts a fetched pool once and pages through it
//!
//! ## Example
//!
//! ```ignore
//! use scout_search::{CriteriaExpander, RankingPipeline, ScoringRuleSet};
//!
//! let rules = ScoringRuleSet::load_or_warn("config/scoring_rules.yaml");
//! let pipeline = RankingPipeline::new(state_store, CriteriaExpander::default());
//!
//! let filter = pipeline.resolve(&criteria).to_filter();
//! let pool = candidates.find(&filter, 30, 0).await?;
//! let page = pipeline.rank_and_commit(&key, &criteria, filter, pool, 5, rules.as_ref());
//!
//! // "show more"
//! let next = pipeline.next_page(&key, 5);
//! ```

pub mod criteria;
pub mod fields;
pub mod levels;
pub mod ranking;
pub mod rules;
pub mod scoring;
pub mod synonyms;

pub use criteria::{CriteriaExpander, ResolvedCriteria};
pub use fields::{CandidateField, FieldValue, RequiredField};
pub use levels::{LevelInfo, LevelResolver, LevelSystem, GENERIC_TITLE};
pub use ranking::{RankedPage, RankingPipeline};
pub use rules::ScoringRuleSet;
pub use scoring::{
    exact_match, keyword_overlap, keyword_presence, range_match, Dimension, DimensionScorer,
    ExactMatchParams, KeywordOverlapParams, KeywordPresenceParams, RangeMatchParams,
    ScoringError, ScoringLogic,
};
pub use synonyms::SynonymTable;
