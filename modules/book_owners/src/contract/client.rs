use async_trait::async_trait;

use crate::contract::{error::BookOwnersError, model::CategorizedBooks};

/// Public API trait for the book_owners module that other modules can use
#[async_trait]
pub trait BookOwnersApi: Send + Sync {
    /// Fetch owners upstream and group their books by owner age category.
    ///
    /// An empty result is `Ok(vec![])`, never an error.
    async fn books_by_category(
        &self,
        hardcover_only: bool,
    ) -> Result<Vec<CategorizedBooks>, BookOwnersError>;
}
