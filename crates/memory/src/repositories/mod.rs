//! Per-entity repository traits and ScyllaDB implementations (§6 Persistence, §3 Data
//! Model). One module per table family, mirroring the rest of this codebase's
//! persistence layer.

pub mod conversations;
pub mod extraction_events;
pub mod facts;
pub mod profiles;
pub mod users;

pub use conversations::{ConversationRepository, ScyllaConversationRepository};
pub use extraction_events::{ExtractionEventRepository, ExtractionOutcome, ScyllaExtractionEventRepository};
pub use facts::{FactRepository, ScyllaFactRepository};
pub use profiles::{ProfileRepository, ScyllaProfileRepository};
pub use users::{ScyllaUserRepository, UserRepository};
