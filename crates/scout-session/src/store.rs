//! Bounded, time-expiring conversation state store.
//!
//! ## Expiry contract
//!
//! - Every write (`commit_page`, `enter_contact_flow`, a successful
//!   `advance_contact_flow`) sets the entry's deadline to `now + ttl`.
//! - Reads never extend the deadline.
//! - An entry is unreadable from its deadline on; it reads as
//!   [`ConversationPhase::Idle`] with no data and is dropped on access.
//! - When full, the least-recently-used entry is evicted.
//!
//! One mutex guards all entries; it is held for a single get, merge, or
//! removal and never across I/O.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use scout_core::{CandidateFilter, CandidateSummary, ConversationKey, QueryCriteria, ScoredCandidate};

use crate::config::SessionConfig;
use crate::state::{
    ContactAnswer, ContactDetails, ContactFlowState, ContactStep, ContactTarget,
    ConversationPhase, ConversationState, PageCommit,
};

struct Entry {
    state: ConversationState,
    expires_at: Instant,
}

/// Per-conversation state keyed by [`ConversationKey`].
pub struct ConversationStateStore {
    entries: Mutex<LruCache<ConversationKey, Entry>>,
    ttl: Duration,
}

impl fmt::Debug for ConversationStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationStateStore")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

impl ConversationStateStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_limits(config.ttl(), config.max_entries)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ConversationKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live entry for `key`, dropping it if expired. Does not touch the deadline.
    fn live<'a>(
        entries: &'a mut LruCache<ConversationKey, Entry>,
        key: &ConversationKey,
        now: Instant,
    ) -> Option<&'a mut Entry> {
        let expired = match entries.peek(key) {
            Some(entry) => now >= entry.expires_at,
            None => return None,
        };
        if expired {
            entries.pop(key);
            debug!(conversation_key = %key, "Conversation state expired");
            return None;
        }
        entries.get_mut(key)
    }

    fn read<T>(&self, key: &ConversationKey, f: impl FnOnce(&ConversationState) -> T) -> Option<T> {
        let mut entries = self.lock();
        Self::live(&mut entries, key, Instant::now()).map(|e| f(&e.state))
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Current phase; `Idle` when absent or expired.
    pub fn phase(&self, key: &ConversationKey) -> ConversationPhase {
        self.read(key, |s| s.phase).unwrap_or_default()
    }

    /// Full copy of the state, if live.
    pub fn snapshot(&self, key: &ConversationKey) -> Option<ConversationState> {
        self.read(key, ConversationState::clone)
    }

    pub fn last_results(&self, key: &ConversationKey) -> Option<Vec<CandidateSummary>> {
        self.read(key, |s| s.last_results.clone()).flatten()
    }

    pub fn query_filter(&self, key: &ConversationKey) -> Option<CandidateFilter> {
        self.read(key, |s| s.query_filter.clone()).flatten()
    }

    pub fn parsed_criteria(&self, key: &ConversationKey) -> Option<QueryCriteria> {
        self.read(key, |s| s.parsed_criteria.clone()).flatten()
    }

    pub fn ranked_pool(&self, key: &ConversationKey) -> Option<Arc<[ScoredCandidate]>> {
        self.read(key, |s| s.ranked_pool.clone()).flatten()
    }

    /// Next pagination offset; 0 when absent.
    pub fn next_offset(&self, key: &ConversationKey) -> usize {
        self.read(key, |s| s.next_offset).unwrap_or(0)
    }

    /// Whether more results follow the last page; false when absent.
    pub fn has_more(&self, key: &ConversationKey) -> bool {
        self.read(key, |s| s.has_more).unwrap_or(false)
    }

    /// Contact-flow sub-state, only while the phase is `ContactFlow`.
    pub fn contact_flow(&self, key: &ConversationKey) -> Option<ContactFlowState> {
        self.read(key, |s| match s.phase {
            ConversationPhase::ContactFlow => s.contact_flow.clone(),
            _ => None,
        })
        .flatten()
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Merge a page commit into the conversation's state and refresh expiry.
    ///
    /// Merge rules for omitted fields:
    /// - `parsed_criteria`, `query_filter`, `ranked_pool`: previous value kept.
    /// - `next_offset`: 0 when the phase is `Idle` or `results` is omitted,
    ///   otherwise the previous offset.
    /// - `has_more`: whether `results` is non-empty.
    ///
    /// Contact-flow sub-state survives only if the committed phase is
    /// `ContactFlow`.
    pub fn commit_page(&self, key: &ConversationKey, commit: PageCommit) {
        let now = Instant::now();
        let mut entries = self.lock();
        let previous = Self::live(&mut entries, key, now)
            .map(|e| std::mem::take(&mut e.state))
            .unwrap_or_default();

        let next_offset = match commit.next_offset {
            Some(offset) => offset,
            None if commit.phase == ConversationPhase::Idle || commit.results.is_none() => 0,
            None => previous.next_offset,
        };
        let has_more = commit
            .has_more
            .unwrap_or_else(|| commit.results.as_ref().is_some_and(|r| !r.is_empty()));
        let contact_flow = match commit.phase {
            ConversationPhase::ContactFlow => previous.contact_flow,
            _ => None,
        };

        let state = ConversationState {
            phase: commit.phase,
            last_results: commit.results,
            query_filter: commit.query_filter.or(previous.query_filter),
            parsed_criteria: commit.parsed_criteria.or(previous.parsed_criteria),
            ranked_pool: commit.ranked_pool.or(previous.ranked_pool),
            next_offset,
            has_more,
            contact_flow,
        };

        debug!(
            conversation_key = %key,
            phase = %state.phase,
            offset = state.next_offset,
            has_more = state.has_more,
            "Committed page state"
        );

        self.put(&mut entries, key, state, now);
    }

    /// Enter the contact flow for a target candidate and refresh expiry.
    ///
    /// Cached page context is kept so the flow can be abandoned back to it.
    pub fn enter_contact_flow(
        &self,
        key: &ConversationKey,
        step: ContactStep,
        target: ContactTarget,
        collected: Option<ContactDetails>,
    ) {
        let now = Instant::now();
        let mut entries = self.lock();
        let mut state = Self::live(&mut entries, key, now)
            .map(|e| std::mem::take(&mut e.state))
            .unwrap_or_default();

        debug!(
            conversation_key = %key,
            candidate_id = %target.candidate_id,
            contact_step = step.as_str(),
            "Entering contact flow"
        );

        state.phase = ConversationPhase::ContactFlow;
        state.contact_flow = Some(ContactFlowState {
            step,
            target,
            collected: collected.unwrap_or_default(),
        });
        self.put(&mut entries, key, state, now);
    }

    /// Move the contact flow to `step`, recording `answer` if given.
    ///
    /// Returns `false` (and changes nothing) unless the conversation is live
    /// and in the contact flow.
    pub fn advance_contact_flow(
        &self,
        key: &ConversationKey,
        step: ContactStep,
        answer: Option<ContactAnswer>,
    ) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        let Some(entry) = Self::live(&mut entries, key, now) else {
            warn!(conversation_key = %key, "Contact flow advance on missing state ignored");
            return false;
        };
        let phase = entry.state.phase;
        let flow = match entry.state.contact_flow.as_mut() {
            Some(flow) if phase == ConversationPhase::ContactFlow => flow,
            _ => {
                warn!(
                    conversation_key = %key,
                    phase = %phase,
                    "Contact flow advance outside contact flow ignored"
                );
                return false;
            }
        };

        flow.step = step;
        if let Some(answer) = answer {
            flow.collected.set(answer.field, answer.value);
        }
        entry.expires_at = now + self.ttl;
        debug!(conversation_key = %key, contact_step = step.as_str(), "Contact flow advanced");
        true
    }

    /// Remove the conversation's state. Idempotent; returns whether a live
    /// entry was removed.
    pub fn clear(&self, key: &ConversationKey) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        let removed = entries.pop(key).is_some_and(|e| now < e.expires_at);
        if removed {
            debug!(conversation_key = %key, "Conversation state cleared");
        }
        removed
    }

    fn put(
        &self,
        entries: &mut LruCache<ConversationKey, Entry>,
        key: &ConversationKey,
        state: ConversationState,
        now: Instant,
    ) {
        let entry = Entry {
            state,
            expires_at: now + self.ttl,
        };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if &evicted != key {
                info!(conversation_key = %evicted, "Conversation state evicted at capacity");
            }
        }
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let expired: Vec<ConversationKey> = entries
            .iter()
            .filter(|(_, e)| now >= e.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Spawn a background task that purges expired entries every `interval`.
    ///
    /// Lazy expiry on access is unaffected; this only bounds memory held by
    /// abandoned conversations. Abort the handle to stop it.
    pub fn spawn_eviction(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Conversation store dropped, stopping eviction task");
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "Purged expired conversation state");
                }
            }
        })
    }
}
