//! Dual-tier memory subsystem: short-term dialog context lives in `nexus-core`; this
//! crate owns the long-term tier — ScyllaDB-backed repositories, the memory service
//! that assembles per-turn context, and the LLM-driven extraction pipeline (§4.6).

pub mod client;
pub mod error;
pub mod extraction;
pub mod repositories;
pub mod schema;
pub mod service;

pub use client::ScyllaClient;
pub use error::MemoryError;
pub use extraction::MemoryExtractionService;
pub use repositories::{
    ConversationRepository, ExtractionEventRepository, ExtractionOutcome, FactRepository,
    ProfileRepository, ScyllaConversationRepository, ScyllaExtractionEventRepository,
    ScyllaFactRepository, ScyllaProfileRepository, ScyllaUserRepository, UserRepository,
};
pub use service::{CleanupStats, MemoryService, UserStats};
