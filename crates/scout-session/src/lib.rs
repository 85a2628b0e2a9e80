//! # scout-session
//!
//! Per-conversation state for talentscout: phase, cached page, pagination
//! cursor, and the nested contact-flow sub-state, held in a bounded LRU
//! store with idle expiry.
//!
//! ## Example
//!
//! ```ignore
//! use scout_session::{ConversationPhase, ConversationStateStore, PageCommit, SessionConfig};
//!
//! let store = ConversationStateStore::new(&SessionConfig::from_env());
//! store.commit_page(
//!     &key,
//!     PageCommit::new(ConversationPhase::WaitingSelection)
//!         .with_results(page)
//!         .with_next_offset(5),
//! );
//! assert_eq!(store.phase(&key), ConversationPhase::WaitingSelection);
//! ```

pub mod config;
pub mod state;
pub mod store;

pub use config::SessionConfig;
pub use state::{
    ContactAnswer, ContactDetails, ContactField, ContactFlowState, ContactStep, ContactTarget,
    ConversationPhase, ConversationState, PageCommit,
};
pub use store::ConversationStateStore;
