//! # scout-db
//!
//! Candidate store layer for talentscout.
//!
//! This crate provides:
//! - Compilation of a [`CandidateFilter`] into an in-process matcher
//! - `MemoryCandidateStore`, a thread-safe in-memory [`CandidateStore`]
//!   used by tests and single-process deployments
//!
//! ## Example
//!
//! ```rust,ignore
//! use scout_db::MemoryCandidateStore;
//! use scout_core::{CandidateFilter, CandidateStore, FilterField};
//!
//! let store = MemoryCandidateStore::new();
//! store.upsert(record).await;
//!
//! let filter = CandidateFilter::new().with_any(FilterField::Location, ["上海"]);
//! let pool = store.find(&filter, 30, 0).await?;
//! ```
//!
//! [`CandidateFilter`]: scout_core::CandidateFilter
//! [`CandidateStore`]: scout_core::CandidateStore

pub mod candidates;
pub mod filter;

pub use candidates::MemoryCandidateStore;
pub use filter::CompiledFilter;
