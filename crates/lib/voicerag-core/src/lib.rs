//! Core types and retrieval adapters for voicerag.
//!
//! This crate defines the tool result envelope shared by all adapters, the
//! search-service protocol consumed by the knowledge and grounding adapters,
//! and the Azure AI Search client implementation.

pub mod credentials;
pub mod grounding;
pub mod knowledge;
pub mod search;
pub mod types;

pub use types::*;
