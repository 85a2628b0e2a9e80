//! # scout-jobs
//!
//! Conversational turn processing for talentscout.
//!
//! This crate provides:
//! - A turn dispatcher with bounded concurrency and strict per-conversation ordering
//! - The recruiting conversation state machine (query, page, follow-up, contact)
//! - Follow-up command parsing and chat reply rendering
//! - Lifecycle events via broadcast channels
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use scout_jobs::{ConversationConfig, ConversationService, DispatcherConfig, TurnContext, TurnDispatcher};
//!
//! let service = ConversationService::new(
//!     ConversationConfig::from_env(),
//!     candidates,
//!     parser,
//!     messenger,
//!     pipeline,
//! );
//! let dispatcher = TurnDispatcher::new(DispatcherConfig::from_env(), Arc::new(service));
//! let handle = dispatcher.start();
//!
//! handle.submit(TurnContext::new("hr-1", None, "找上海的高级结构工程师")).await?;
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod commands;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod handler;
pub mod render;

// Re-export core types
pub use scout_core::*;

pub use commands::{CommandVerb, FollowUpCommand, ParsedReply};
pub use config::{ConversationConfig, DispatcherConfig};
pub use conversation::ConversationService;
pub use dispatcher::{DispatcherEvent, DispatcherHandle, TurnDispatcher};
pub use handler::{NoOpHandler, TurnContext, TurnHandler, TurnOutcome};

/// Default number of turns processed concurrently.
pub const DEFAULT_MAX_CONCURRENT_TURNS: usize = scout_core::defaults::TURN_MAX_CONCURRENT;
