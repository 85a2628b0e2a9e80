//! Conversation state types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use scout_core::{CandidateFilter, CandidateSummary, QueryCriteria, ScoredCandidate};

/// Top-level phase of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    /// No pending context; the next message is a new query.
    #[default]
    Idle,
    /// A ranked page was shown and a follow-up command is expected.
    WaitingSelection,
    /// Collecting details before messaging a candidate.
    ContactFlow,
}

impl ConversationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::WaitingSelection => "waiting_selection",
            Self::ContactFlow => "contact_flow",
        }
    }
}

impl fmt::Display for ConversationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the contact sub-flow; each step awaits one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStep {
    AwaitingWorkLocation,
    AwaitingJobContent,
    AwaitingTimeArrangement,
}

impl ContactStep {
    /// Step following this one, `None` after the last.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::AwaitingWorkLocation => Some(Self::AwaitingJobContent),
            Self::AwaitingJobContent => Some(Self::AwaitingTimeArrangement),
            Self::AwaitingTimeArrangement => None,
        }
    }

    /// Detail field answered at this step.
    pub fn field(self) -> ContactField {
        match self {
            Self::AwaitingWorkLocation => ContactField::WorkLocation,
            Self::AwaitingJobContent => ContactField::JobContent,
            Self::AwaitingTimeArrangement => ContactField::TimeArrangement,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingWorkLocation => "awaiting_work_location",
            Self::AwaitingJobContent => "awaiting_job_content",
            Self::AwaitingTimeArrangement => "awaiting_time_arrangement",
        }
    }
}

/// Detail collected during the contact flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    WorkLocation,
    JobContent,
    TimeArrangement,
}

/// Answers collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactDetails {
    pub work_location: Option<String>,
    pub job_content: Option<String>,
    pub time_arrangement: Option<String>,
}

impl ContactDetails {
    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::WorkLocation => &mut self.work_location,
            ContactField::JobContent => &mut self.job_content,
            ContactField::TimeArrangement => &mut self.time_arrangement,
        };
        *slot = Some(value.into());
    }

    pub fn get(&self, field: ContactField) -> Option<&str> {
        match field {
            ContactField::WorkLocation => self.work_location.as_deref(),
            ContactField::JobContent => self.job_content.as_deref(),
            ContactField::TimeArrangement => self.time_arrangement.as_deref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.work_location.is_some() && self.job_content.is_some() && self.time_arrangement.is_some()
    }
}

/// One answer recorded while advancing the contact flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactAnswer {
    pub field: ContactField,
    pub value: String,
}

impl ContactAnswer {
    pub fn new(field: ContactField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Candidate the contact flow will message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTarget {
    pub candidate_id: String,
    pub candidate_name: String,
    /// External contact id (or chat id) the invitation is sent to.
    pub contact_handle: String,
}

/// Nested contact-flow sub-state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFlowState {
    pub step: ContactStep,
    pub target: ContactTarget,
    pub collected: ContactDetails,
}

/// Everything remembered about one conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub phase: ConversationPhase,
    /// Projections of the page last shown.
    pub last_results: Option<Vec<CandidateSummary>>,
    /// Filter used to fetch the pool.
    pub query_filter: Option<CandidateFilter>,
    /// Criteria as parsed from the original query, kept across pages.
    pub parsed_criteria: Option<QueryCriteria>,
    /// Ranked pool snapshot; later pages are sliced from it.
    pub ranked_pool: Option<Arc<[ScoredCandidate]>>,
    pub next_offset: usize,
    pub has_more: bool,
    /// Present only while `phase` is [`ConversationPhase::ContactFlow`].
    pub contact_flow: Option<ContactFlowState>,
}

/// Atomic update written by [`crate::ConversationStateStore::commit_page`].
///
/// Omitted fields follow the merge rules documented on `commit_page`.
#[derive(Debug, Clone)]
pub struct PageCommit {
    pub phase: ConversationPhase,
    pub results: Option<Vec<CandidateSummary>>,
    pub query_filter: Option<CandidateFilter>,
    pub parsed_criteria: Option<QueryCriteria>,
    pub ranked_pool: Option<Arc<[ScoredCandidate]>>,
    pub next_offset: Option<usize>,
    pub has_more: Option<bool>,
}

impl PageCommit {
    pub fn new(phase: ConversationPhase) -> Self {
        Self {
            phase,
            results: None,
            query_filter: None,
            parsed_criteria: None,
            ranked_pool: None,
            next_offset: None,
            has_more: None,
        }
    }

    pub fn with_results(mut self, results: Vec<CandidateSummary>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_query_filter(mut self, filter: CandidateFilter) -> Self {
        self.query_filter = Some(filter);
        self
    }

    pub fn with_parsed_criteria(mut self, criteria: QueryCriteria) -> Self {
        self.parsed_criteria = Some(criteria);
        self
    }

    pub fn with_ranked_pool(mut self, pool: Arc<[ScoredCandidate]>) -> Self {
        self.ranked_pool = Some(pool);
        self
    }

    pub fn with_next_offset(mut self, offset: usize) -> Self {
        self.next_offset = Some(offset);
        self
    }

    pub fn with_has_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_steps_advance_in_order() {
        let mut step = ContactStep::AwaitingWorkLocation;
        let mut fields = vec![step.field()];
        while let Some(next) = step.next() {
            step = next;
            fields.push(step.field());
        }
        assert_eq!(
            fields,
            vec![
                ContactField::WorkLocation,
                ContactField::JobContent,
                ContactField::TimeArrangement
            ]
        );
    }

    #[test]
    fn test_contact_details_complete() {
        let mut details = ContactDetails::default();
        details.set(ContactField::WorkLocation, "上海");
        details.set(ContactField::JobContent, "结构设计");
        assert!(!details.is_complete());
        details.set(ContactField::TimeArrangement, "周三下午");
        assert!(details.is_complete());
        assert_eq!(details.get(ContactField::JobContent), Some("结构设计"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ConversationPhase::default().to_string(), "idle");
        assert_eq!(
            ConversationPhase::WaitingSelection.to_string(),
            "waiting_selection"
        );
    }
}
