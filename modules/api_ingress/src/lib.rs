use async_trait::async_trait;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use anyhow::{Context, Result};
use axum::http::Method;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use modkit::api::{OpenApiRegistry, OperationSpec, SchemaCollection};
use modkit::context::ConfigError;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};

mod config;
mod openapi;
pub mod request_id;
mod route_case;
mod web;

pub use config::{ApiIngressConfig, DEFAULT_BIND_ADDR};
pub use openapi::{ComponentsRegistry, OpenApi};

pub const MODULE_NAME: &str = "api_ingress";

const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;
const STOP_TIMEOUT: Duration = Duration::from_secs(30);
const API_TITLE: &str = "Bookshelf API";
const HOST_PATHS: [&str; 3] = ["/health", "/openapi.json", "/docs"];

struct ServerHandle {
    token: CancellationToken,
    task: JoinHandle<std::io::Result<()>>,
}

/// Main API Ingress module: owns the HTTP server (rest_host) and collects
/// typed operation specs to emit a single OpenAPI document.
pub struct ApiIngress {
    // Lock-free config using arc-swap for read-mostly access
    config: ArcSwap<ApiIngressConfig>,
    components_registry: ArcSwap<ComponentsRegistry>,
    // Router produced by the REST phase, taken by `start`
    final_router: Mutex<Option<Router>>,
    server: Mutex<Option<ServerHandle>>,
    bound_addr: Mutex<Option<SocketAddr>>,

    // Duplicate detection (per (method, path) and per handler id)
    registered_routes: DashMap<(Method, String), ()>,
    registered_handlers: DashMap<String, ()>,

    operation_specs: DashMap<String, OperationSpec>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components_registry: ArcSwap::from_pointee(ComponentsRegistry::default()),
            final_router: Mutex::new(None),
            server: Mutex::new(None),
            bound_addr: Mutex::new(None),
            registered_routes: DashMap::new(),
            registered_handlers: DashMap::new(),
            operation_specs: DashMap::new(),
        }
    }

    pub fn get_config(&self) -> Arc<ApiIngressConfig> {
        self.config.load_full()
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.lock()
    }

    /// Wrap `router` in the ingress middleware stack.
    ///
    /// Outermost first: path case folding (ahead of routing), set request id,
    /// propagate it to the response, trace, expose the id to handlers, catch
    /// panics, CORS, body limit. No request timeout is imposed here.
    pub fn apply_middleware(&self, router: Router) -> Router {
        let cfg = self.get_config();
        let hdr = request_id::header();

        // Router::layer wraps what is already there, so layers go innermost first.
        let mut router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        let routed = router
            .layer(CatchPanicLayer::custom(web::panic_response))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(hdr.clone()))
            .layer(SetRequestIdLayer::new(hdr, request_id::MakeReqId));

        // Route layers run after routing; the path rewrite wraps the whole router.
        Router::new()
            .fallback_service(routed)
            .layer(from_fn_with_state(
                self.route_paths(),
                route_case::canonicalize_path,
            ))
    }

    fn route_paths(&self) -> route_case::RoutePaths {
        let paths: Vec<String> = self
            .operation_specs
            .iter()
            .map(|e| e.value().path.clone())
            .chain(HOST_PATHS.iter().map(|p| p.to_string()))
            .collect();
        route_case::RoutePaths::new(paths)
    }

    /// Assemble the OpenAPI document from everything registered so far.
    pub fn build_openapi(&self) -> OpenApi {
        let mut specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|e| e.value().clone())
            .collect();
        specs.sort_by(|a, b| a.handler_id.cmp(&b.handler_id));

        let components = self.components_registry.load();
        openapi::build_document(
            API_TITLE,
            env!("CARGO_PKG_VERSION"),
            specs.iter(),
            &components,
        )
    }

    fn read_config(ctx: &modkit::ModuleCtx) -> Result<ApiIngressConfig> {
        match ctx.module_config_required::<ApiIngressConfig>() {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::MissingConfigSection { .. } | ConfigError::NoProvider) => {
                Ok(ApiIngressConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = Self::read_config(ctx)?;
        cfg.bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid api_ingress.bind_addr '{}'", cfg.bind_addr))?;
        tracing::debug!(
            bind_addr = %cfg.bind_addr,
            enable_docs = cfg.enable_docs,
            cors_enabled = cfg.cors_enabled,
            "api_ingress configured"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }
}

impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        if self.get_config().enable_docs {
            let doc = serde_json::to_value(self.build_openapi())
                .context("failed to serialize OpenAPI document")?;
            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move { Json(doc) }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        let router = self.apply_middleware(router);
        *self.final_router.lock() = Some(router.clone());
        tracing::info!(
            operations = self.operation_specs.len(),
            schemas = self.components_registry.load().len(),
            "REST router finalized"
        );
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

#[async_trait]
impl modkit::contracts::StatefulModule for ApiIngress {
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .with_context(|| format!("invalid api_ingress.bind_addr '{}'", cfg.bind_addr))?;

        let stored = self.final_router.lock().clone();
        let router = match stored {
            Some(r) => r,
            None => self.apply_middleware(Router::new().route("/health", get(web::health_check))),
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind HTTP server to {addr}"))?;
        let local = listener.local_addr()?;
        *self.bound_addr.lock() = Some(local);
        tracing::info!(addr = %local, "HTTP server listening");

        let token = cancel.child_token();
        let shutdown = token.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        });
        *self.server.lock() = Some(ServerHandle { token, task });
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> Result<()> {
        let server = self.server.lock().take();
        let Some(server) = server else {
            return Ok(());
        };
        server.token.cancel();

        match tokio::time::timeout(STOP_TIMEOUT, server.task).await {
            Ok(Ok(Ok(()))) => {
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(e).context("HTTP server failed"),
            Ok(Err(join)) => Err(join).context("HTTP server task aborted"),
            Err(_) => {
                tracing::warn!(timeout_secs = STOP_TIMEOUT.as_secs(), "HTTP server did not stop in time");
                Ok(())
            }
        }
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) -> bool {
        let route_key = (spec.method.clone(), spec.path.clone());
        if self.registered_handlers.contains_key(&spec.handler_id)
            || self.registered_routes.contains_key(&route_key)
        {
            tracing::error!(
                handler_id = %spec.handler_id,
                method = %spec.method,
                path = %spec.path,
                "duplicate operation rejected"
            );
            return false;
        }

        self.registered_handlers.insert(spec.handler_id.clone(), ());
        self.registered_routes.insert(route_key, ());
        self.operation_specs
            .insert(spec.handler_id.clone(), spec.clone());

        tracing::debug!(
            handler_id = %spec.handler_id,
            method = %spec.method,
            path = %spec.path,
            summary = %spec.summary.as_deref().unwrap_or("No summary"),
            "registered API operation"
        );
        true
    }

    fn ensure_schema_raw(&self, root_name: &str, schemas: SchemaCollection) -> String {
        let current = self.components_registry.load();
        let mut fresh = Vec::with_capacity(schemas.len());
        for (name, schema) in schemas {
            let value = match serde_json::to_value(&schema) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(schema = %name, error = %e, "failed to serialize schema");
                    continue;
                }
            };
            match current.get(&name) {
                Some(existing) if *existing != value => {
                    tracing::warn!(schema = %name, "conflicting schema definition ignored");
                }
                Some(_) => {}
                None => fresh.push((name, value)),
            }
        }

        if !fresh.is_empty() {
            self.components_registry
                .rcu(|reg| Arc::new(reg.merged(&fresh)));
        }
        root_name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
