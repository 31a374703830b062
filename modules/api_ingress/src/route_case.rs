//! Case-insensitive request paths.
//!
//! A request whose path equals a registered route up to ASCII case is
//! rewritten to the registered spelling before routing, so
//! `/API/Owners/BooksByCategory` reaches `/api/owners/booksbycategory`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{uri::PathAndQuery, Uri},
    middleware::Next,
    response::Response,
};

/// Registered route paths; templated paths (`{param}`) are not rewritten.
#[derive(Clone, Debug, Default)]
pub struct RoutePaths {
    paths: Arc<Vec<String>>,
}

impl RoutePaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = paths
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.contains('{'))
            .collect();
        Self {
            paths: Arc::new(paths),
        }
    }

    /// Registered spelling of `path`, when it differs only in ASCII case.
    pub fn canonical(&self, path: &str) -> Option<&str> {
        self.paths
            .iter()
            .find(|p| p.as_str() != path && p.eq_ignore_ascii_case(path))
            .map(String::as_str)
    }
}

fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let pq = match uri.query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(pq.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

/// Middleware: rewrite the request path to its registered spelling.
pub async fn canonicalize_path(
    State(paths): State<RoutePaths>,
    mut req: Request,
    next: Next,
) -> Response {
    let rewritten = paths
        .canonical(req.uri().path())
        .and_then(|path| with_path(req.uri(), path));
    if let Some(uri) = rewritten {
        *req.uri_mut() = uri;
    }
    next.run(req).await
}
