use std::sync::Arc;

use tracing::{debug, instrument};

use crate::contract::model::CategorizedBooks;
use crate::domain::{categorizer::categorize, error::DomainError, ports::OwnersSource};

/// Fetches owners and categorizes their books; one upstream call per request.
pub struct Service {
    source: Arc<dyn OwnersSource>,
}

impl Service {
    pub fn new(source: Arc<dyn OwnersSource>) -> Self {
        Self { source }
    }

    #[instrument(name = "book_owners.service.books_by_category", skip(self))]
    pub async fn books_by_category(
        &self,
        hardcover_only: bool,
    ) -> Result<Vec<CategorizedBooks>, DomainError> {
        let owners = self.source.fetch_owners().await?;
        let buckets = categorize(&owners, hardcover_only);
        debug!(
            owners = owners.len(),
            categories = buckets.len(),
            "books categorized"
        );
        Ok(buckets)
    }
}
