//! Centralized default constants for talentscout.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers; environment-driven configs fall back to them.

// =============================================================================
// CONVERSATION STATE
// =============================================================================

/// Idle time-to-live of one conversation's state, in seconds.
pub const STATE_TTL_SECS: u64 = 180;

/// Maximum number of conversation states held at once (LRU beyond this).
pub const STATE_MAX_ENTRIES: usize = 1024;

/// Interval of the optional background expiry sweep, in seconds.
pub const STATE_SWEEP_INTERVAL_SECS: u64 = 60;

// =============================================================================
// RANKING
// =============================================================================

/// Candidates fetched per new query when no rule set supplies a pool size.
pub const INITIAL_POOL_SIZE: usize = 30;

/// Candidates shown per page.
pub const DISPLAY_LIMIT: usize = 5;

/// Score assigned to candidates ranked without a rule set (display only).
pub const UNSCORED: f64 = 0.0;

// =============================================================================
// SCORING: range_match
// =============================================================================

/// Score when the candidate value equals the requirement.
pub const RANGE_BASE_SCORE: f64 = 1.0;

/// Shortfall (in units, usually years) tolerated at the gentle decay rate.
pub const RANGE_TOLERANCE: f64 = 0.0;

/// Fraction of the base score lost per unit of shortfall.
pub const RANGE_DECAY_RATE: f64 = 0.1;

/// Floor for range scores, also used when either value is absent.
pub const RANGE_MIN_SCORE: f64 = 0.0;

/// Fraction of the base score gained per unit above the requirement.
pub const RANGE_BONUS_RATE: f64 = 0.05;

/// Decay multiplier applied to shortfall beyond the tolerance.
pub const RANGE_BEYOND_TOLERANCE_MULTIPLIER: f64 = 1.5;

// =============================================================================
// SCORING: keyword and exact matching
// =============================================================================

/// Raw score per matched keyword.
pub const KEYWORD_SCORE_PER_MATCH: f64 = 1.0;

/// Full score of a keyword dimension when nothing is demanded.
pub const KEYWORD_FULL_SCORE: f64 = 1.0;

/// Cap of keyword_presence scores.
pub const KEYWORD_PRESENCE_MAX_SCORE: f64 = 1.0;

/// exact_match score on equality.
pub const EXACT_MATCH_SCORE: f64 = 1.0;

/// exact_match score on inequality.
pub const EXACT_MISMATCH_SCORE: f64 = 0.0;

// =============================================================================
// TURN DISPATCH
// =============================================================================

/// Maximum turns processed concurrently across all conversations.
pub const TURN_MAX_CONCURRENT: usize = 5;

/// Capacity of the inbound turn channel.
pub const TURN_QUEUE_CAPACITY: usize = 256;

/// Capacity of the dispatcher event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// RENDERING
// =============================================================================

/// Maximum characters of a candidate summary shown in detail replies.
pub const SUMMARY_EXCERPT_CHARS: usize = 120;

// =============================================================================
// LOGGING
// =============================================================================

/// Filter directive used when `RUST_LOG` is unset.
pub const LOG_FILTER: &str =
    "scout_core=info,scout_db=info,scout_session=info,scout_search=info,scout_jobs=info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_defaults_are_positive() {
        assert!(STATE_TTL_SECS > 0);
        assert!(STATE_MAX_ENTRIES > 0);
    }

    #[test]
    fn test_pool_holds_at_least_one_page() {
        assert!(INITIAL_POOL_SIZE >= DISPLAY_LIMIT);
    }

    #[test]
    fn test_range_decay_is_steeper_beyond_tolerance() {
        assert!(RANGE_BEYOND_TOLERANCE_MULTIPLIER > 1.0);
        assert!(RANGE_MIN_SCORE < RANGE_BASE_SCORE);
    }
}
