//! Integration tests for the API Ingress router and OperationBuilder
//!
//! Drives the registry REST phase with the ingress as host and checks routing,
//! the served OpenAPI document and the server lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    Json, Router,
};
use modkit::api::{ApiResult, OperationBuilder};
use modkit::contracts::{RestHostModule, StatefulModule};
use modkit::{ConfigProvider, ModuleCtx, ModuleCtxBuilder, ModuleRegistry, OpenApiRegistry};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;
use utoipa::ToSchema;

use api_ingress::{ApiIngress, ApiIngressConfig};

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct Shelf {
    pub id: u32,
    pub label: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    wide: bool,
}

pub struct TestShelvesModule;

#[async_trait]
impl modkit::Module for TestShelvesModule {
    async fn init(&self, _ctx: &ModuleCtx) -> Result<()> {
        Ok(())
    }
}

impl modkit::RestfulModule for TestShelvesModule {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: Router,
        openapi: &dyn OpenApiRegistry,
    ) -> Result<Router> {
        let router = OperationBuilder::get("/shelves")
            .operation_id("shelves.list")
            .summary("List shelves")
            .tag("shelves")
            .query_param_typed("wide", false, "Only wide shelves", "boolean")
            .handler(list_shelves)
            .json_array_response_with_schema::<Shelf>(openapi, 200, "Shelves")
            .problem_response(openapi, 500, "Internal Server Error")
            .register(router, openapi);

        let router = OperationBuilder::get("/shelves/reserved")
            .operation_id("shelves.reserved")
            .handler(reserved_shelf)
            .text_response(200, "Reserved shelf")
            .problem_response(openapi, 500, "Internal Server Error")
            .register(router, openapi);

        let router = OperationBuilder::get("/shelves/slow")
            .operation_id("shelves.slow")
            .handler(slow_shelf)
            .text_response(200, "Eventually a shelf")
            .register(router, openapi);

        // Same method and path: rejected, the first handler keeps serving
        let router = OperationBuilder::get("/shelves")
            .operation_id("shelves.list.again")
            .handler(|| async { "shadowed" })
            .text_response(200, "Shadow")
            .register(router, openapi);

        Ok(router)
    }
}

async fn list_shelves(Query(q): Query<ListQuery>) -> Json<Vec<Shelf>> {
    let mut shelves = vec![Shelf {
        id: 1,
        label: "narrow".into(),
    }];
    if !q.wide {
        shelves.push(Shelf {
            id: 2,
            label: "wide".into(),
        });
    }
    Json(shelves)
}

async fn reserved_shelf() -> ApiResult<&'static str> {
    Err(anyhow::anyhow!("shelf 0 is reserved").into())
}

async fn slow_shelf() -> &'static str {
    tokio::time::sleep(Duration::from_secs(120)).await;
    "finally"
}

struct MapProvider(HashMap<String, serde_json::Value>);

impl ConfigProvider for MapProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get(module_name)
    }
}

fn ctx_with(ingress_cfg: serde_json::Value) -> ModuleCtx {
    let mut sections = HashMap::new();
    sections.insert("api_ingress".to_string(), ingress_cfg);
    ModuleCtxBuilder::new(CancellationToken::new())
        .with_config_provider(Arc::new(MapProvider(sections)))
        .build()
}

async fn build_app(ingress_cfg: serde_json::Value) -> (Arc<ApiIngress>, Router) {
    let ingress = Arc::new(ApiIngress::default());
    let shelves = Arc::new(TestShelvesModule);

    let registry = ModuleRegistry::builder()
        .register_core("api_ingress", ingress.clone())
        .register_rest_host("api_ingress", ingress.clone())
        .register_core("shelves", shelves.clone())
        .register_rest("shelves", shelves)
        .build()
        .unwrap();

    let ctx = ctx_with(ingress_cfg);
    registry.run_init_phase(&ctx).await.unwrap();
    let router = registry.run_rest_phase(&ctx, Router::new()).unwrap();
    (ingress, router)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_and_operations_are_served() {
    let (_ingress, router) = build_app(serde_json::json!({ "enable_docs": true })).await;

    let (status, health) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, shelves) = get_json(&router, "/shelves?wide=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shelves, serde_json::json!([{ "id": 1, "label": "narrow" }]));

    let (status, shelves) = get_json(&router, "/shelves").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shelves.as_array().map(Vec::len), Some(2));

    let (status, _) = get_json(&router, "/SHELVES?wide=true").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn handler_errors_render_as_problem() {
    let (_ingress, router) = build_app(serde_json::json!({})).await;

    let (status, problem) = get_json(&router, "/shelves/reserved").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem["type"], "Server error");
    assert_eq!(problem["title"], "Server Error");
    assert_eq!(problem["status"], 500);
    assert_eq!(problem["detail"], "shelf 0 is reserved");
}

#[tokio::test]
async fn invalid_bool_query_is_rejected() {
    let (_ingress, router) = build_app(serde_json::json!({})).await;

    let resp = router
        .oneshot(Request::get("/shelves?wide=maybe").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_describes_registered_operations() {
    let (ingress, router) = build_app(serde_json::json!({ "enable_docs": true })).await;

    let (status, doc) = get_json(&router, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc, serde_json::to_value(ingress.build_openapi()).unwrap());

    let list = &doc["paths"]["/shelves"]["get"];
    assert_eq!(list["operationId"], "shelves.list");
    assert_eq!(list["parameters"][0]["name"], "wide");
    assert_eq!(list["parameters"][0]["schema"]["type"], "boolean");
    assert_eq!(
        list["responses"]["200"]["content"]["application/json"]["schema"],
        serde_json::json!({ "type": "array", "items": { "$ref": "#/components/schemas/Shelf" } })
    );
    assert_eq!(
        list["responses"]["500"]["content"]["application/problem+json"]["schema"]["$ref"],
        "#/components/schemas/Problem"
    );

    assert_eq!(list["parameters"][0]["in"], "query");
    assert!(doc["paths"]["/shelves/reserved"]["get"]["parameters"].is_null());

    assert!(doc["components"]["schemas"]["Shelf"].is_object());
    assert!(doc["components"]["schemas"]["Problem"].is_object());

    let resp = router
        .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test(start_paused = true)]
async fn slow_handlers_are_not_cut_off() {
    let (_ingress, router) = build_app(serde_json::json!({})).await;

    let resp = router
        .oneshot(Request::get("/shelves/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"finally");
}

#[tokio::test]
async fn docs_are_not_served_unless_enabled() {
    let (_ingress, router) = build_app(serde_json::json!({})).await;

    let (status, _) = get_json(&router, "/openapi.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&router, "/docs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_operation_keeps_first_handler() {
    let (ingress, router) = build_app(serde_json::json!({ "enable_docs": true })).await;

    let (status, shelves) = get_json(&router, "/shelves").await;
    assert_eq!(status, StatusCode::OK);
    assert!(shelves.is_array());

    let doc = serde_json::to_value(ingress.build_openapi()).unwrap();
    assert_eq!(doc["paths"]["/shelves"]["get"]["operationId"], "shelves.list");
}

#[tokio::test]
async fn invalid_bind_addr_fails_init() {
    let ingress = Arc::new(ApiIngress::default());
    let registry = ModuleRegistry::builder()
        .register_core("api_ingress", ingress.clone())
        .register_rest_host("api_ingress", ingress)
        .build()
        .unwrap();

    let ctx = ctx_with(serde_json::json!({ "bind_addr": "not-an-address" }));
    let err = anyhow::Error::from(registry.run_init_phase(&ctx).await.unwrap_err());
    assert!(format!("{err:#}").contains("bind_addr"), "{err:#}");
}

#[tokio::test]
async fn server_starts_and_stops() {
    let ingress = Arc::new(ApiIngress::new(ApiIngressConfig {
        bind_addr: "127.0.0.1:0".into(),
        ..ApiIngressConfig::default()
    }));
    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .for_module("api_ingress")
        .build();
    let router = ingress.rest_prepare(&ctx, Router::new()).unwrap();
    ingress.rest_finalize(&ctx, router).unwrap();

    let cancel = CancellationToken::new();
    ingress.start(cancel.clone()).await.unwrap();
    let addr = ingress.local_addr().expect("bound address");

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let body = resp.text().await.unwrap();
    assert!(body.contains("healthy"));

    ingress.stop(cancel).await.unwrap();
    assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
}
