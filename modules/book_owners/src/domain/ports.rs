use async_trait::async_trait;

use crate::contract::model::Owner;
use crate::domain::error::DomainError;

/// Where owners come from. One call per invocation, no caching.
#[async_trait]
pub trait OwnersSource: Send + Sync {
    async fn fetch_owners(&self) -> Result<Vec<Owner>, DomainError>;
}
