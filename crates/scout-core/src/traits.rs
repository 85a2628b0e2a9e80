//! Core traits for talentscout's external collaborators.
//!
//! These traits define the interfaces that concrete backends (document
//! store, language-model query parser, chat transport) must satisfy, so the
//! ranking and conversation logic can be tested with in-memory doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::CandidateFilter;
use crate::models::{CandidateRecord, QueryCriteria};

// =============================================================================
// CANDIDATE STORE
// =============================================================================

/// Read access to stored candidate records.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Fetch up to `limit` records matching `filter`, skipping `offset`.
    async fn find(
        &self,
        filter: &CandidateFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CandidateRecord>>;

    /// Fetch one record by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<CandidateRecord>>;
}

// =============================================================================
// QUERY PARSER
// =============================================================================

/// Turns free text into structured criteria.
#[async_trait]
pub trait QueryParser: Send + Sync {
    /// `Ok(None)` means the text carried no recruiting intent.
    async fn parse(&self, text: &str) -> Result<Option<QueryCriteria>>;
}

// =============================================================================
// MESSAGING
// =============================================================================

/// Transport-side reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outbound chat transport. Each call reports success or failure only.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message to internal recipients.
    async fn send_text(&self, content: &str, recipients: &[String]) -> Result<()>;

    /// Upload a local file and return its transport reference.
    async fn upload_media(&self, path: &str) -> Result<MediaRef>;

    /// Send a previously uploaded file.
    async fn send_file(&self, media: &MediaRef, recipients: &[String]) -> Result<()>;

    /// Send a message from an internal sender to an external contact.
    async fn send_to_external_contact(
        &self,
        sender_id: &str,
        external_contact_id: &str,
        content: &str,
    ) -> Result<()>;
}
