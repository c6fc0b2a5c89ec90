//! The search provider contract (§6): `search(SearchRequest) -> SearchResults`.

use async_trait::async_trait;
use nexus_core::{SearchRequest, SearchResults};

use crate::SearchError;

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<SearchResults, SearchError>;

    /// Stable identifier used in logs and telemetry.
    fn provider_name(&self) -> &str;
}
