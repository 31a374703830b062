use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::Router;
use modkit::{ModuleCtx, OpenApiRegistry, TracedClient};

use crate::api::rest::routes;
use crate::config::BookOwnersConfig;
use crate::contract::client::BookOwnersApi;
use crate::domain::service::Service;
use crate::gateways::local::BookOwnersLocalClient;
use crate::infra::upstream::http_owners_client::HttpOwnersClient;

pub const MODULE_NAME: &str = "book_owners";

/// Wires the upstream client, the domain service and the REST endpoint.
#[derive(Default)]
pub struct BookOwnersModule {
    service: ArcSwapOption<Service>,
}

impl BookOwnersModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for other modules; `None` until `init` has run.
    pub fn client(&self) -> Option<Arc<dyn BookOwnersApi>> {
        self.service
            .load_full()
            .map(|svc| Arc::new(BookOwnersLocalClient::new(svc)) as Arc<dyn BookOwnersApi>)
    }
}

#[async_trait]
impl modkit::Module for BookOwnersModule {
    async fn init(&self, ctx: &ModuleCtx) -> Result<()> {
        let cfg: BookOwnersConfig = ctx
            .module_config_required()
            .context("book_owners requires modules.book_owners.base_url")?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("bookshelf-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build upstream HTTP client")?;
        let source = HttpOwnersClient::new(
            TracedClient::new(http),
            &cfg.base_url,
            cfg.request_timeout(),
        )?;

        tracing::info!(
            endpoint = %source.endpoint(),
            timeout_ms = ?cfg.request_timeout_ms,
            "book_owners upstream configured"
        );
        self.service
            .store(Some(Arc::new(Service::new(Arc::new(source)))));
        Ok(())
    }
}

impl modkit::RestfulModule for BookOwnersModule {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> Result<Router> {
        let api = self
            .client()
            .ok_or_else(|| anyhow!("book_owners registered before init"))?;
        routes::register_routes(router, openapi, api)
    }
}
