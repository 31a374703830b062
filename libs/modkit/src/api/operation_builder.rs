//! Type-safe API operation builder with compile-time guarantees
//!
//! The builder tracks two type-state slots:
//! - `register()` cannot be called unless a handler is set
//! - `register()` cannot be called unless at least one response is declared
//!
//! Descriptive methods stay available at any stage. Every registered operation
//! is reported to an [`OpenApiRegistry`], which the REST host turns into the
//! served OpenAPI document.

use axum::{handler::Handler, routing::MethodRouter, Router};
use http::Method;
use std::marker::PhantomData;

use crate::api::problem::{Problem, APPLICATION_PROBLEM_JSON};

/// Type alias for schema collections used in API operations.
pub type SchemaCollection = Vec<(
    String,
    utoipa::openapi::RefOr<utoipa::openapi::schema::Schema>,
)>;

/// Type-state markers for compile-time enforcement
pub mod state {
    /// Marker for missing required components
    #[derive(Debug, Clone, Copy)]
    pub struct Missing;

    /// Marker for present required components
    #[derive(Debug, Clone, Copy)]
    pub struct Present;
}

pub use state::{Missing, Present};

mod sealed {
    pub trait Sealed {}
}

/// Maps the handler state to its router slot: nothing for `Missing`,
/// a `MethodRouter<S>` for `Present`.
pub trait HandlerSlot<S>: sealed::Sealed {
    type Slot;
}

impl sealed::Sealed for Missing {}
impl sealed::Sealed for Present {}

impl<S> HandlerSlot<S> for Missing {
    type Slot = ();
}
impl<S> HandlerSlot<S> for Present {
    type Slot = MethodRouter<S>;
}

/// A query string parameter.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub required: bool,
    pub description: Option<String>,
    /// JSON Schema type (string, boolean, integer, ...)
    pub param_type: String,
}

#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub status: u16,
    pub content_type: &'static str,
    pub description: String,
    /// Name of a registered component schema (if any).
    pub schema_name: Option<String>,
    /// Body is a JSON array of `schema_name` items.
    pub array: bool,
}

#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub responses: Vec<ResponseSpec>,
    /// Stable identity derived from method and path; used to reject duplicates.
    pub handler_id: String,
}

/// Registry trait for OpenAPI operations and schemas
pub trait OpenApiRegistry: Send + Sync {
    /// Record an operation. Returns `false` when an operation with the same
    /// handler id or method and path is already known; the caller must not
    /// mount the rejected route.
    fn register_operation(&self, spec: &OperationSpec) -> bool;

    /// Ensure the schemas (root first, then its dependencies) are present under
    /// components and return the canonical component name for `$ref`.
    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// Register `T` and everything it references; returns the component name.
pub fn ensure_schema<T: utoipa::ToSchema + utoipa::PartialSchema + 'static>(
    registry: &dyn OpenApiRegistry,
) -> String {
    let root_name = T::name().to_string();

    // Root goes in as the real object (not a ref) to avoid self-referential components.
    let mut collected: SchemaCollection =
        vec![(root_name.clone(), <T as utoipa::PartialSchema>::schema())];
    T::schemas(&mut collected);

    registry.ensure_schema_raw(&root_name, collected)
}

/// Generic parameters:
/// - `H`: Handler state (Missing | Present)
/// - `R`: Response state (Missing | Present)
/// - `S`: Router state type
pub struct OperationBuilder<H, R, S>
where
    H: HandlerSlot<S>,
{
    spec: OperationSpec,
    method_router: <H as HandlerSlot<S>>::Slot,
    _has_handler: PhantomData<H>,
    _has_response: PhantomData<R>,
    _state: PhantomData<fn() -> S>,
}

impl<S> OperationBuilder<Missing, Missing, S> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let handler_id = format!(
            "{}:{}",
            method.as_str().to_lowercase(),
            path.replace(['/', '{', '}'], "_")
        );

        Self {
            spec: OperationSpec {
                method,
                path,
                operation_id: None,
                summary: None,
                description: None,
                tags: Vec::new(),
                params: Vec::new(),
                responses: Vec::new(),
                handler_id,
            },
            method_router: (),
            _has_handler: PhantomData,
            _has_response: PhantomData,
            _state: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }
}

// Descriptive methods and responses: available at any stage.
impl<H, R, S> OperationBuilder<H, R, S>
where
    H: HandlerSlot<S>,
{
    /// Inspect the spec (primarily for tests)
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.spec.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.spec.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    /// Add a query parameter with an explicit OpenAPI type
    pub fn query_param_typed(
        mut self,
        name: impl Into<String>,
        required: bool,
        description: impl Into<String>,
        param_type: impl Into<String>,
    ) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.into(),
            required,
            description: Some(description.into()),
            param_type: param_type.into(),
        });
        self
    }

    /// Declare a response; the response slot becomes `Present`.
    fn response(mut self, resp: ResponseSpec) -> OperationBuilder<H, Present, S> {
        self.spec.responses.push(resp);
        OperationBuilder {
            spec: self.spec,
            method_router: self.method_router,
            _has_handler: self._has_handler,
            _has_response: PhantomData,
            _state: self._state,
        }
    }

    /// JSON response whose body is an array of `T`.
    pub fn json_array_response_with_schema<T>(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S>
    where
        T: utoipa::ToSchema + utoipa::PartialSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.response(ResponseSpec {
            status,
            content_type: "application/json",
            description: description.into(),
            schema_name: Some(name),
            array: true,
        })
    }

    pub fn text_response(
        self,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        self.response(ResponseSpec {
            status,
            content_type: "text/plain",
            description: description.into(),
            schema_name: None,
            array: false,
        })
    }

    /// RFC 9457 `application/problem+json` response referencing the shared `Problem` schema.
    pub fn problem_response(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        let problem_name = ensure_schema::<Problem>(registry);
        self.response(ResponseSpec {
            status,
            content_type: APPLICATION_PROBLEM_JSON,
            description: description.into(),
            schema_name: Some(problem_name),
            array: false,
        })
    }
}

impl<R, S> OperationBuilder<Missing, R, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Set the handler; the handler slot becomes `Present`.
    pub fn handler<F, T>(self, h: F) -> OperationBuilder<Present, R, S>
    where
        F: Handler<T, S> + Clone + Send + 'static,
        T: 'static,
    {
        let method_router = axum::routing::on(
            axum::routing::MethodFilter::try_from(self.spec.method.clone())
                .unwrap_or(axum::routing::MethodFilter::GET),
            h,
        );

        OperationBuilder {
            spec: self.spec,
            method_router,
            _has_handler: PhantomData,
            _has_response: self._has_response,
            _state: self._state,
        }
    }
}

impl<S> OperationBuilder<Present, Present, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Report the operation to `openapi` and mount it on `router`.
    /// A duplicate is left unmounted and the first registration stays in place.
    pub fn register(self, router: Router<S>, openapi: &dyn OpenApiRegistry) -> Router<S> {
        if !openapi.register_operation(&self.spec) {
            tracing::warn!(
                handler_id = %self.spec.handler_id,
                method = %self.spec.method,
                path = %self.spec.path,
                "duplicate operation skipped"
            );
            return router;
        }
        router.route(&self.spec.path, self.method_router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use parking_lot::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct MockRegistry {
        operations: Mutex<Vec<OperationSpec>>,
        schemas: Mutex<Vec<String>>,
    }

    impl OpenApiRegistry for MockRegistry {
        fn register_operation(&self, spec: &OperationSpec) -> bool {
            let mut ops = self.operations.lock();
            if ops.iter().any(|o| o.handler_id == spec.handler_id) {
                return false;
            }
            ops.push(spec.clone());
            true
        }

        fn ensure_schema_raw(&self, name: &str, _schemas: SchemaCollection) -> String {
            self.schemas.lock().push(name.to_string());
            name.to_string()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[derive(serde::Serialize, utoipa::ToSchema)]
    struct Shelf {
        title: String,
    }

    async fn shelf_handler() -> axum::Json<Vec<Shelf>> {
        axum::Json(vec![Shelf {
            title: "top".into(),
        }])
    }

    #[test]
    fn descriptive_methods_fill_the_spec() {
        let builder = OperationBuilder::<Missing, Missing, ()>::get("/shelves/top")
            .operation_id("shelves.top")
            .summary("Top shelf")
            .description("Fetch the top shelf")
            .tag("shelves")
            .query_param_typed("verbose", false, "Include details", "boolean");

        let spec = builder.spec();
        assert_eq!(spec.method, Method::GET);
        assert_eq!(spec.path, "/shelves/top");
        assert_eq!(spec.operation_id.as_deref(), Some("shelves.top"));
        assert_eq!(spec.tags, vec!["shelves"]);
        assert_eq!(spec.handler_id, "get:_shelves_top");
        assert_eq!(spec.params.len(), 1);
        assert_eq!(spec.params[0].name, "verbose");
        assert_eq!(spec.params[0].param_type, "boolean");
        assert!(!spec.params[0].required);
    }

    #[test]
    fn responses_register_schemas_in_order() {
        let registry = MockRegistry::default();
        let builder = OperationBuilder::<Missing, Missing, ()>::get("/shelves")
            .handler(shelf_handler)
            .json_array_response_with_schema::<Shelf>(&registry, 200, "Shelves")
            .text_response(404, "Nothing here")
            .problem_response(&registry, 500, "Internal Server Error");

        let statuses: Vec<_> = builder.spec().responses.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![200, 404, 500]);
        assert!(builder.spec().responses[0].array);
        assert_eq!(builder.spec().responses[0].schema_name.as_deref(), Some("Shelf"));
        assert_eq!(builder.spec().responses[1].content_type, "text/plain");
        assert_eq!(
            builder.spec().responses[2].content_type,
            APPLICATION_PROBLEM_JSON
        );
        assert_eq!(
            builder.spec().responses[2].schema_name.as_deref(),
            Some("Problem")
        );
        assert!(registry.schemas.lock().contains(&"Problem".to_string()));
    }

    #[tokio::test]
    async fn register_reports_operation_and_mounts_route() {
        let registry = MockRegistry::default();

        let router = OperationBuilder::<Missing, Missing, ()>::get("/shelves")
            .operation_id("shelves.list")
            .handler(shelf_handler)
            .json_array_response_with_schema::<Shelf>(&registry, 200, "Shelves")
            .register(Router::new(), &registry);

        assert_eq!(registry.operations.lock().len(), 1);

        let resp = router
            .oneshot(Request::get("/shelves").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejected_duplicate_is_not_mounted() {
        let registry = MockRegistry::default();

        async fn other() -> &'static str {
            "second"
        }

        let router = OperationBuilder::<Missing, Missing, ()>::get("/shelves")
            .handler(shelf_handler)
            .json_array_response_with_schema::<Shelf>(&registry, 200, "Shelves")
            .register(Router::new(), &registry);
        let router = OperationBuilder::<Missing, Missing, ()>::get("/shelves")
            .handler(other)
            .text_response(200, "Other")
            .register(router, &registry);

        assert_eq!(registry.operations.lock().len(), 1);

        let resp = router
            .oneshot(Request::get("/shelves").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"[{"title":"top"}]"#);
    }
}
