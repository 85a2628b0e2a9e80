//! # scout-core
//!
//! Core types, traits, and abstractions for talentscout.
//!
//! This crate provides the data model (query criteria, candidate records,
//! ranked projections), the structural candidate filter, the collaborator
//! traits other crates are written against, and the shared error type,
//! defaults, and logging schema.

pub mod defaults;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use filter::{CandidateFilter, FilterClause, FilterField};
pub use models::*;
pub use traits::*;
