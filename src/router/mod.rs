//! API Router
//!
//! Maps a request method and path to a [`Route`]. API routes live under a
//! configurable base path (default `/api`); `/health` and `/metrics` sit
//! outside it and bypass authentication.

use thiserror::Error;

/// Router errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl RouterError {
    /// Envelope code for this error
    pub fn code(&self) -> u16 {
        match self {
            RouterError::NotFound => 404,
            RouterError::MethodNotAllowed => 405,
        }
    }
}

/// Resolved route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// GET /health
    Health,
    /// GET /metrics
    Metrics,
    /// GET {base}/get
    Hello,
    /// POST {base}/upload
    Upload,
    /// Anything under the base path that did not resolve
    ApiError(RouterError),
    /// Anything outside the base path
    NotFound,
}

impl Route {
    /// Whether the route sits behind the authorization gate
    pub fn requires_auth(&self) -> bool {
        matches!(self, Route::Hello | Route::Upload | Route::ApiError(_))
    }
}

/// Request router
#[derive(Debug, Clone)]
pub struct Router {
    base_path: String,
}

impl Router {
    /// Create a router for API routes under `base_path`
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Resolve a request to a route
    pub fn resolve(&self, method: &str, path: &str) -> Route {
        match path {
            "/health" => return Self::only(method, "GET", Route::Health, Route::NotFound),
            "/metrics" => return Self::only(method, "GET", Route::Metrics, Route::NotFound),
            _ => {}
        }

        let Some(api_path) = self.strip_base(path) else {
            return Route::NotFound;
        };

        let not_allowed = Route::ApiError(RouterError::MethodNotAllowed);
        match api_path {
            "/get" => Self::only(method, "GET", Route::Hello, not_allowed),
            "/upload" => Self::only(method, "POST", Route::Upload, not_allowed),
            _ => Route::ApiError(RouterError::NotFound),
        }
    }

    /// Path relative to the base path, if the path is under it
    fn strip_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.base_path.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn only(method: &str, expected: &str, route: Route, otherwise: Route) -> Route {
        if method == expected {
            route
        } else {
            otherwise
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/api")
    }
}
