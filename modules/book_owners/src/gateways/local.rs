use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::BookOwnersApi, error::BookOwnersError, model::CategorizedBooks,
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the BookOwnersApi trait that delegates to the domain service
pub struct BookOwnersLocalClient {
    service: Arc<Service>,
}

impl BookOwnersLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl BookOwnersApi for BookOwnersLocalClient {
    async fn books_by_category(
        &self,
        hardcover_only: bool,
    ) -> Result<Vec<CategorizedBooks>, BookOwnersError> {
        self.service
            .books_by_category(hardcover_only)
            .await
            .map_err(map_domain_error)
    }
}

/// Map domain errors to contract errors, keeping the original text
fn map_domain_error(domain_error: DomainError) -> BookOwnersError {
    let message = domain_error.to_string();
    match domain_error {
        DomainError::UpstreamRequest { .. } => BookOwnersError::upstream(message),
        DomainError::UpstreamTimeout { .. } => BookOwnersError::timeout(message),
        DomainError::MalformedPayload { .. } => BookOwnersError::invalid_payload(message),
        DomainError::InvalidBaseUrl { .. } => BookOwnersError::internal(message),
    }
}
