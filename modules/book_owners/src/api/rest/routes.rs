use axum::{Extension, Router};
use modkit::api::{OpenApiRegistry, OperationBuilder};
use std::sync::Arc;

use crate::api::rest::{dto, handlers};
use crate::contract::client::BookOwnersApi;

pub const BOOKS_BY_CATEGORY_PATH: &str = "/api/owners/booksbycategory";

pub fn register_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    api: Arc<dyn BookOwnersApi>,
) -> anyhow::Result<Router> {
    // GET /api/owners/booksbycategory - Books grouped by owner age category
    router = OperationBuilder::<modkit::api::Missing, modkit::api::Missing, ()>::get(
        BOOKS_BY_CATEGORY_PATH,
    )
    .operation_id("book_owners.books_by_category")
    .summary("Books by owner age category")
    .description(
        "Fetch owners from the upstream service and return their books grouped into \
         Child (under 18) and Adult, each group sorted by book name",
    )
    .tag("owners")
    .query_param_typed(
        "hardcoverOnly",
        false,
        "Keep only books whose type is exactly \"Hardcover\"",
        "boolean",
    )
    .handler(handlers::books_by_category)
    .json_array_response_with_schema::<dto::CategorizedBooksDto>(openapi, 200, "Categorized books")
    .text_response(404, handlers::NO_BOOKS_FOUND)
    .problem_response(openapi, 500, "Internal Server Error")
    .register(router, openapi);

    router = router.layer(Extension(api));

    Ok(router)
}
