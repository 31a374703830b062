//! Traced HTTP client for calls to other services.
//!
//! Every request runs inside an `outgoing_http` span and carries a W3C
//! `traceparent` header.

use tracing::{field::Empty, Instrument, Level};

use crate::http::simple_otel;

#[derive(Clone, Debug)]
pub struct TracedClient {
    inner: reqwest::Client,
}

impl TracedClient {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Execute a built request inside an `outgoing_http` span.
    pub async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::span!(
            Level::INFO,
            "outgoing_http",
            http.method = %req.method(),
            http.url = %req.url(),
            http.status_code = Empty,
            error = Empty,
            otel.kind = "client",
        );

        simple_otel::inject_trace_context(req.headers_mut());

        async {
            let result = self.inner.execute(req).await;
            let span = tracing::Span::current();
            match &result {
                Ok(resp) => {
                    let status = resp.status();
                    span.record("http.status_code", status.as_u16());
                    if status.is_client_error() || status.is_server_error() {
                        span.record("error", true);
                    }
                    tracing::debug!(status = status.as_u16(), "outgoing request completed");
                }
                Err(e) => {
                    span.record("error", true);
                    tracing::debug!(error = %e, "outgoing request failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Underlying client, for building requests by hand.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

impl From<reqwest::Client> for TracedClient {
    fn from(c: reqwest::Client) -> Self {
        Self::new(c)
    }
}

impl Default for TracedClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn injects_traceparent_header() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET).path("/ping").header_exists("traceparent");
                then.status(200).body("ok");
            })
            .await;

        let client = TracedClient::from(reqwest::Client::new());
        let req = client.inner().get(server.url("/ping")).build().unwrap();
        let resp = client.execute(req).await.unwrap();

        assert!(resp.status().is_success());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(503);
            })
            .await;

        let client = TracedClient::default();
        let req = client.inner().get(server.url("/broken")).build().unwrap();
        let resp = client.execute(req).await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);
    }
}
