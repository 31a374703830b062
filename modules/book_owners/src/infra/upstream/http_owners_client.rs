use std::time::Duration;

use async_trait::async_trait;
use modkit::TracedClient;
use reqwest::header::ACCEPT;
use tracing::{debug, instrument};
use url::Url;

use crate::contract::model::Owner;
use crate::domain::{error::DomainError, ports::OwnersSource};
use crate::infra::upstream::wire::OwnerRecord;

/// Path of the owners listing, relative to the configured base URL.
pub const OWNERS_PATH: [&str; 3] = ["api", "v1", "bookowners"];

/// `OwnersSource` backed by the upstream HTTP service.
pub struct HttpOwnersClient {
    client: TracedClient,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl HttpOwnersClient {
    /// `timeout` of `None` leaves the transport default in place.
    pub fn new(
        client: TracedClient,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            client,
            endpoint: owners_endpoint(base_url)?,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `{base_url}/api/v1/bookowners`; a trailing slash on the base is ignored.
pub fn owners_endpoint(base_url: &str) -> Result<Url, DomainError> {
    let mut url =
        Url::parse(base_url).map_err(|e| DomainError::invalid_base_url(base_url, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DomainError::invalid_base_url(
            base_url,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| DomainError::invalid_base_url(base_url, "cannot be a base"))?
        .pop_if_empty()
        .extend(OWNERS_PATH);
    Ok(url)
}

/// Empty, whitespace-only and `null` bodies all mean "no owners".
pub fn parse_owners(body: &[u8]) -> Result<Vec<Owner>, DomainError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let records: Option<Vec<OwnerRecord>> = serde_json::from_slice(body)
        .map_err(|e| DomainError::malformed_payload(e.to_string()))?;
    Ok(records
        .unwrap_or_default()
        .into_iter()
        .map(Owner::from)
        .collect())
}

fn transport_error(err: reqwest::Error) -> DomainError {
    let (timeout, decode) = (err.is_timeout(), err.is_decode());
    let message = format!("{:#}", anyhow::Error::from(err));
    if timeout {
        DomainError::upstream_timeout(message)
    } else if decode {
        DomainError::malformed_payload(message)
    } else {
        DomainError::upstream_request(message)
    }
}

#[async_trait]
impl OwnersSource for HttpOwnersClient {
    #[instrument(name = "book_owners.http.fetch_owners", skip(self), fields(url = %self.endpoint))]
    async fn fetch_owners(&self) -> Result<Vec<Owner>, DomainError> {
        let mut request = self
            .client
            .inner()
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json");
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let request = request.build().map_err(transport_error)?;

        let response = self
            .client
            .execute(request)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport_error)?;
        let body = response.bytes().await.map_err(transport_error)?;

        let owners = parse_owners(&body)?;
        debug!(owners = owners.len(), bytes = body.len(), "owners fetched");
        Ok(owners)
    }
}
