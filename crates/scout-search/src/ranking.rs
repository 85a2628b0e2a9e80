//! Ranking pipeline: score a fetched pool, sort, paginate, persist context.
//!
//! The pool is fetched from the store once per new query. Scoring happens
//! once, the ranked pool is cached in conversation state, and every later
//! "show more" slices that cached pool.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use scout_core::{
    CandidateFilter, CandidateRecord, CandidateSummary, ConversationKey, QueryCriteria,
    ScoredCandidate,
};
use scout_session::{ConversationPhase, ConversationStateStore, PageCommit};

use crate::criteria::{CriteriaExpander, ResolvedCriteria};
use crate::rules::ScoringRuleSet;
use crate::scoring::DimensionScorer;

/// One page of a ranked pool.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    /// Candidates in `[offset, next_offset)` of the ranked pool.
    pub page: Vec<ScoredCandidate>,
    /// Index of the first candidate on this page.
    pub offset: usize,
    /// Index of the first candidate on the following page.
    pub next_offset: usize,
    pub has_more: bool,
    /// Size of the whole ranked pool.
    pub total: usize,
}

impl RankedPage {
    fn slice(pool: &[ScoredCandidate], offset: usize, display_limit: usize) -> Self {
        let total = pool.len();
        let start = offset.min(total);
        let end = offset.saturating_add(display_limit).min(total);
        Self {
            page: pool[start..end].to_vec(),
            offset,
            next_offset: end,
            has_more: offset.saturating_add(display_limit) < total,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_empty()
    }

    /// Projections numbered by global 1-based rank.
    pub fn summaries(&self) -> Vec<CandidateSummary> {
        self.page
            .iter()
            .enumerate()
            .map(|(i, c)| c.summarize(self.offset + i + 1))
            .collect()
    }
}

/// Orchestrates scoring, sorting and pagination for one conversation.
#[derive(Debug, Clone)]
pub struct RankingPipeline {
    store: Arc<ConversationStateStore>,
    expander: CriteriaExpander,
}

impl RankingPipeline {
    pub fn new(store: Arc<ConversationStateStore>, expander: CriteriaExpander) -> Self {
        Self { store, expander }
    }

    pub fn store(&self) -> &Arc<ConversationStateStore> {
        &self.store
    }

    pub fn expander(&self) -> &CriteriaExpander {
        &self.expander
    }

    /// Expand certificate requirements and synonyms for a query.
    pub fn resolve(&self, criteria: &QueryCriteria) -> ResolvedCriteria {
        self.expander.expand(criteria)
    }

    /// Score and stable-sort a pool.
    ///
    /// Without a rule set the pool is returned unscored in retrieval order.
    /// With one, the pool is first bounded to `initial_pool_size`.
    pub fn score_pool(
        &self,
        resolved: &ResolvedCriteria,
        pool: Vec<CandidateRecord>,
        rules: Option<&ScoringRuleSet>,
    ) -> Vec<ScoredCandidate> {
        let Some(rules) = rules else {
            warn!(pool_size = pool.len(), "No scoring rules, ranking unscored");
            return pool.into_iter().map(ScoredCandidate::unscored).collect();
        };

        let start = Instant::now();
        let scorer = DimensionScorer::new(&rules.dimensions);
        let mut scored: Vec<ScoredCandidate> = pool
            .into_iter()
            .take(rules.initial_pool_size)
            .map(|record| {
                let score = scorer.score(resolved, &record);
                ScoredCandidate {
                    record,
                    score: Some(score),
                }
            })
            .collect();

        // `sort_by` is stable, so ties keep retrieval order.
        scored.sort_by(|a, b| {
            let a = a.score.unwrap_or_default();
            let b = b.score.unwrap_or_default();
            b.total_cmp(&a)
        });

        debug!(
            pool_size = scored.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Scored candidate pool"
        );
        scored
    }

    /// Rank a pool and slice `[offset, offset + display_limit)`.
    pub fn rank(
        &self,
        criteria: &QueryCriteria,
        pool: Vec<CandidateRecord>,
        offset: usize,
        display_limit: usize,
        rules: Option<&ScoringRuleSet>,
    ) -> RankedPage {
        let resolved = self.resolve(criteria);
        let ranked = self.score_pool(&resolved, pool, rules);
        RankedPage::slice(&ranked, offset, display_limit)
    }

    /// Rank a freshly fetched pool, show its first page, and persist the
    /// ranked pool with the query context for follow-up commands.
    pub fn rank_and_commit(
        &self,
        key: &ConversationKey,
        criteria: &QueryCriteria,
        filter: CandidateFilter,
        pool: Vec<CandidateRecord>,
        display_limit: usize,
        rules: Option<&ScoringRuleSet>,
    ) -> RankedPage {
        let resolved = self.resolve(criteria);
        let ranked: Arc<[ScoredCandidate]> = self.score_pool(&resolved, pool, rules).into();
        let page = RankedPage::slice(&ranked, 0, display_limit);

        self.store.commit_page(
            key,
            PageCommit::new(ConversationPhase::WaitingSelection)
                .with_results(page.summaries())
                .with_query_filter(filter)
                .with_parsed_criteria(criteria.clone())
                .with_ranked_pool(ranked)
                .with_next_offset(page.next_offset)
                .with_has_more(page.has_more),
        );

        info!(
            conversation_key = %key,
            pool_size = page.total,
            page_size = page.page.len(),
            has_more = page.has_more,
            "Ranked first page"
        );
        page
    }

    /// Slice the next page from the cached ranked pool and commit it.
    ///
    /// Returns `None` when the conversation has no cached pool (expired or
    /// never ranked). Cached filter and criteria carry over untouched.
    pub fn next_page(&self, key: &ConversationKey, display_limit: usize) -> Option<RankedPage> {
        let ranked = self.store.ranked_pool(key)?;
        let offset = self.store.next_offset(key);
        let page = RankedPage::slice(&ranked, offset, display_limit);

        self.store.commit_page(
            key,
            PageCommit::new(ConversationPhase::WaitingSelection)
                .with_results(page.summaries())
                .with_next_offset(page.next_offset)
                .with_has_more(page.has_more),
        );

        debug!(
            conversation_key = %key,
            offset,
            page_size = page.page.len(),
            has_more = page.has_more,
            "Served next page from cached pool"
        );
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CandidateField, RequiredField};
    use crate::scoring::{Dimension, RangeMatchParams, ScoringLogic};
    use scout_core::FilterField;

    fn pipeline() -> RankingPipeline {
        let store = Arc::new(ConversationStateStore::with_limits(
            std::time::Duration::from_secs(180),
            64,
        ));
        RankingPipeline::new(store, CriteriaExpander::default())
    }

    fn experience_rules(pool_size: usize) -> ScoringRuleSet {
        ScoringRuleSet::new(
            pool_size,
            vec![Dimension::new(
                "experience",
                10.0,
                ScoringLogic::RangeMatch(RangeMatchParams::default()),
            )
            .with_fields(
                RequiredField::ExperienceYearsMin,
                CandidateField::MinExperienceYears,
            )],
        )
    }

    fn criteria() -> QueryCriteria {
        QueryCriteria {
            experience_years_min: Some(3),
            ..Default::default()
        }
    }

    /// Candidate `i` has `i` years, so ranking reverses the pool.
    fn pool(n: u32) -> Vec<CandidateRecord> {
        (0..n)
            .map(|i| {
                let mut record = CandidateRecord::new(format!("c{}", i), format!("候选人{}", i));
                record.query_tags.min_experience_years = Some(i);
                record
            })
            .collect()
    }

    fn ids(page: &RankedPage) -> Vec<String> {
        page.page.iter().map(|c| c.record.id.clone()).collect()
    }

    fn key() -> ConversationKey {
        ConversationKey::new("user-1")
    }

    #[tokio::test]
    async fn test_twelve_candidates_paginate_by_five() {
        let pipeline = pipeline();
        let rules = experience_rules(30);
        let filter = CandidateFilter::new().with_experience_range(Some(3), None);

        let first = pipeline.rank_and_commit(&key(), &criteria(), filter, pool(12), 5, Some(&rules));
        assert_eq!(ids(&first), ["c11", "c10", "c9", "c8", "c7"]);
        assert_eq!((first.next_offset, first.has_more), (5, true));

        let second = pipeline.next_page(&key(), 5).unwrap();
        assert_eq!(ids(&second), ["c6", "c5", "c4", "c3", "c2"]);
        assert_eq!((second.next_offset, second.has_more), (10, true));

        let third = pipeline.next_page(&key(), 5).unwrap();
        assert_eq!(ids(&third), ["c1", "c0"]);
        assert_eq!((third.next_offset, third.has_more), (12, false));
    }

    #[tokio::test]
    async fn test_pages_keep_context_and_global_ranks() {
        let pipeline = pipeline();
        let filter = CandidateFilter::new().with_experience_range(Some(3), None);
        pipeline.rank_and_commit(
            &key(),
            &criteria(),
            filter.clone(),
            pool(12),
            5,
            Some(&experience_rules(30)),
        );
        pipeline.next_page(&key(), 5).unwrap();

        let store = pipeline.store();
        assert_eq!(store.phase(&key()), ConversationPhase::WaitingSelection);
        assert_eq!(store.parsed_criteria(&key()), Some(criteria()));
        assert_eq!(store.query_filter(&key()), Some(filter));

        let ranks: Vec<usize> = store
            .last_results(&key())
            .unwrap()
            .iter()
            .map(|s| s.rank)
            .collect();
        assert_eq!(ranks, [6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_rank_slices_directly() {
        let page = pipeline().rank(&criteria(), pool(12), 10, 5, Some(&experience_rules(30)));
        assert_eq!(ids(&page), ["c1", "c0"]);
        assert_eq!((page.next_offset, page.has_more, page.total), (12, false, 12));

        let past_end = pipeline().rank(&criteria(), pool(3), 5, 5, None);
        assert!(past_end.is_empty());
        assert!(!past_end.has_more);
    }

    #[test]
    fn test_no_rules_keeps_retrieval_order() {
        let page = pipeline().rank(&criteria(), pool(12), 0, 12, None);
        let expected: Vec<String> = (0..12).map(|i| format!("c{}", i)).collect();
        assert_eq!(ids(&page), expected);
        assert!(page.page.iter().all(|c| c.score.is_none()));
    }

    #[test]
    fn test_pool_bounded_by_rule_set() {
        let page = pipeline().rank(&criteria(), pool(12), 0, 50, Some(&experience_rules(4)));
        assert_eq!(page.total, 4);
        assert_eq!(ids(&page), ["c3", "c2", "c1", "c0"]);
    }

    #[test]
    fn test_ties_keep_retrieval_order() {
        let mut records = pool(4);
        for r in &mut records {
            r.query_tags.min_experience_years = Some(5);
        }
        let page = pipeline().rank(&criteria(), records, 0, 5, Some(&experience_rules(30)));
        assert_eq!(ids(&page), ["c0", "c1", "c2", "c3"]);
    }

    #[test]
    fn test_unknown_logic_contributes_zero() {
        let rules = ScoringRuleSet::new(
            30,
            vec![
                Dimension::new(
                    "semantic",
                    50.0,
                    ScoringLogic::Unsupported {
                        logic_type: "semantic_similarity".to_string(),
                    },
                ),
                Dimension::new(
                    "experience",
                    10.0,
                    ScoringLogic::RangeMatch(RangeMatchParams::default()),
                )
                .with_fields(
                    RequiredField::ExperienceYearsMin,
                    CandidateField::MinExperienceYears,
                ),
            ],
        );
        let page = pipeline().rank(&criteria(), pool(4), 0, 5, Some(&rules));
        assert_eq!(ids(&page), ["c3", "c2", "c1", "c0"]);
        assert_eq!(page.page[0].score, Some(10.0));
    }

    #[test]
    fn test_pipeline_debug_includes_store() {
        let rendered = format!("{:?}", pipeline());
        assert!(rendered.contains("ConversationStateStore { ttl: 180s, len: 0 }"));
    }

    #[test]
    fn test_next_page_without_state() {
        assert!(pipeline().next_page(&key(), 5).is_none());
    }

    #[test]
    fn test_certifications_expanded_before_scoring() {
        use crate::scoring::KeywordPresenceParams;
        use scout_core::{CertificationRequirement, LevelModifier};

        let rules = ScoringRuleSet::new(
            30,
            vec![Dimension::new(
                "certifications",
                5.0,
                ScoringLogic::KeywordPresence(KeywordPresenceParams::default()),
            )
            .with_fields(RequiredField::Certifications, CandidateField::Certifications)],
        );
        let criteria = QueryCriteria {
            certifications: vec![
                CertificationRequirement::new("工程师").with_level("中级", LevelModifier::Ge)
            ],
            ..Default::default()
        };
        let mut senior = CandidateRecord::new("senior", "李四");
        senior.query_tags.certifications = vec!["高级工程师".to_string()];
        let mut junior = CandidateRecord::new("junior", "王五");
        junior.query_tags.certifications = vec!["助理工程师".to_string()];

        let pipeline = pipeline();
        let resolved = pipeline.resolve(&criteria);
        assert!(resolved.to_filter().has_field(FilterField::Certifications));

        let page = pipeline.rank(&criteria, vec![junior, senior], 0, 5, Some(&rules));
        assert_eq!(ids(&page), ["senior", "junior"]);
        assert_eq!(page.page[0].score, Some(5.0));
        assert_eq!(page.page[1].score, Some(0.0));
    }
}
