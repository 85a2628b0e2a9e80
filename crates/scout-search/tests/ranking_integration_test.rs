//! Integration tests for rule-driven ranking.
//!
//! This test suite validates:
//! - A YAML rule set drives weighted multi-dimension ranking
//! - Certificate requirements are level-expanded for filter and scoring
//! - A broken dimension never aborts ranking of the pool
//! - Show-more pages come from the cached pool across the whole search

use std::sync::Arc;
use std::time::Duration;

use scout_core::{
    CandidateRecord, CertificateEntry, CertificationRequirement, ConversationKey, FilterField,
    LevelModifier, QueryCriteria,
};
use scout_search::{CriteriaExpander, RankingPipeline, ScoringRuleSet};
use scout_session::{ConversationPhase, ConversationStateStore};

const RULES: &str = r#"
scoring_rules:
  initial_candidate_pool_size: 10
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
          score_decay_rate: 0.2
    skills:
      enabled: true
      weight: 20
      logic:
        type: keyword_overlap
        required_value_path: query.criteria.skills
        candidate_value_path: candidate.query_tags.skills_normalized
    certifications:
      enabled: true
      weight: 25
      logic:
        type: keyword_presence
        required_value_path: query.criteria.certifications
        candidate_value_path: candidate.query_tags.certifications
    location:
      enabled: true
      weight: 10
      logic:
        type: exact_match
        required_value_path: query.criteria.location
        candidate_value_path: candidate.query_tags.location
    broken:
      enabled: true
      weight: 100
      logic:
        type: range_match
        required_value_path: query.criteria.experience_years_min
        candidate_value_path: candidate.query_tags.positions
"#;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn pipeline() -> RankingPipeline {
    let store = Arc::new(ConversationStateStore::with_limits(
        Duration::from_secs(180),
        128,
    ));
    RankingPipeline::new(store, CriteriaExpander::default())
}

fn candidate(id: &str, years: u32, skills: &[&str], cert: Option<&str>, city: &str) -> CandidateRecord {
    let mut record = CandidateRecord::new(id, format!("候选人-{}", id));
    record.query_tags.min_experience_years = Some(years);
    record.query_tags.skills_normalized = skills.iter().map(|s| s.to_string()).collect();
    record.query_tags.certifications = cert.iter().map(|c| c.to_string()).collect();
    record.query_tags.location = Some(city.to_string());
    record
}

fn criteria() -> QueryCriteria {
    QueryCriteria {
        position: Some("结构工程师".to_string()),
        experience_years_min: Some(5),
        skills: ["autocad", "revit"].iter().map(|s| s.to_string()).collect(),
        location: Some("上海".to_string()),
        certifications: vec![
            CertificationRequirement::new("工程师").with_level("中级", LevelModifier::Ge)
        ],
        ..Default::default()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_yaml_rules_rank_best_match_first() {
    let rules = ScoringRuleSet::from_yaml_str(RULES).unwrap();
    let pool = vec![
        candidate("weak", 2, &["sketchup"], Some("助理工程师"), "北京"),
        candidate("strong", 8, &["autocad", "revit"], Some("高级工程师"), "上海"),
        candidate("middle", 5, &["autocad"], Some("中级工程师"), "苏州"),
    ];

    let page = pipeline().rank(&criteria(), pool, 0, 5, Some(&rules));
    let order: Vec<&str> = page.page.iter().map(|c| c.record.id.as_str()).collect();
    assert_eq!(order, ["strong", "middle", "weak"]);

    // strong: experience 30 * (1 + 3 * 0.05) + skills 20 * 2 + certs 25 + location 10.
    let strong = page.page[0].score.unwrap();
    assert!((strong - (34.5 + 40.0 + 25.0 + 10.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_broken_dimension_does_not_abort_ranking() {
    let rules = ScoringRuleSet::from_yaml_str(RULES).unwrap();
    let pool: Vec<CandidateRecord> = (0..6)
        .map(|i| candidate(&format!("c{}", i), i, &[], None, "上海"))
        .collect();

    let page = pipeline().rank(&criteria(), pool, 0, 10, Some(&rules));
    assert_eq!(page.total, 6);
    assert!(page.page.iter().all(|c| c.score.is_some_and(f64::is_finite)));
    assert_eq!(page.page[0].record.id, "c5");
}

#[tokio::test]
async fn test_filter_carries_expanded_certificates() {
    let resolved = pipeline().resolve(&criteria());
    let filter = resolved.to_filter();

    assert!(filter.has_field(FilterField::Certifications));
    assert!(filter.has_field(FilterField::Skills));
    assert!(!filter.has_field(FilterField::Positions));
    assert!(resolved.certificate_variants.contains("高级工程师"));
    assert!(!resolved.certificate_variants.contains("助理工程师"));
}

#[tokio::test]
async fn test_extracted_info_fallback_is_scored() {
    let rules = ScoringRuleSet::from_yaml_str(RULES).unwrap();
    let mut tagged = candidate("tagged", 5, &[], None, "上海");
    tagged.query_tags.location = None;
    tagged.extracted_info.current_location = Some("上海".to_string());
    tagged.extracted_info.certifications = vec![CertificateEntry::new("工程师", Some("中级"))];

    let page = pipeline().rank(&criteria(), vec![tagged], 0, 5, Some(&rules));
    // experience 30 + certs 25 (from extracted info) + location 10.
    assert_eq!(page.page[0].score, Some(65.0));
}

#[tokio::test]
async fn test_show_more_walks_cached_pool_to_the_end() {
    let rules = ScoringRuleSet::from_yaml_str(RULES).unwrap();
    let pipeline = pipeline();
    let key = ConversationKey::from_parts("zhangsan", Some("room-7"));
    let pool: Vec<CandidateRecord> = (0..12)
        .map(|i| candidate(&format!("c{:02}", i), i, &[], None, "上海"))
        .collect();
    let filter = pipeline.resolve(&criteria()).to_filter();

    // Pool bounded to the rule set's 10.
    let first = pipeline.rank_and_commit(&key, &criteria(), filter, pool, 4, Some(&rules));
    assert_eq!(first.total, 10);
    assert!(first.has_more);

    let second = pipeline.next_page(&key, 4).unwrap();
    assert_eq!((second.offset, second.next_offset, second.has_more), (4, 8, true));

    let third = pipeline.next_page(&key, 4).unwrap();
    assert_eq!(third.page.len(), 2);
    assert!(!third.has_more);

    let store = pipeline.store();
    assert_eq!(store.phase(&key), ConversationPhase::WaitingSelection);
    assert!(!store.has_more(&key));
    assert_eq!(store.parsed_criteria(&key), Some(criteria()));
}
