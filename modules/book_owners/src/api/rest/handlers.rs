use std::sync::Arc;

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use modkit::api::ApiResult;
use tracing::info;

use crate::api::rest::dto::{BooksByCategoryQuery, CategorizedBooksDto};
use crate::contract::client::BookOwnersApi;

/// Body of the 404 answer when no book survives.
pub const NO_BOOKS_FOUND: &str = "No categorized books found";

/// Books grouped by owner age category; 404 when there are none.
pub async fn books_by_category(
    Extension(api): Extension<Arc<dyn BookOwnersApi>>,
    Query(query): Query<BooksByCategoryQuery>,
) -> ApiResult<Response> {
    info!(hardcover_only = query.hardcover_only, "listing books by category");

    let buckets = api.books_by_category(query.hardcover_only).await?;
    if buckets.is_empty() {
        return Ok((StatusCode::NOT_FOUND, NO_BOOKS_FOUND).into_response());
    }

    let body: Vec<CategorizedBooksDto> = buckets.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}
