//! Search provider interface (§6): `search(SearchRequest) -> SearchResults`, plus the
//! MCP-over-HTTP reference implementation.

pub mod error;
pub mod mcp;
pub mod provider;

pub use error::SearchError;
pub use mcp::McpSearchProvider;
pub use provider::SearchProvider;
