//! Request handling
//!
//! Every request is resolved by the router, gated by the authenticator when
//! the route is an API route, then dispatched. API responses are JSON
//! envelopes whose HTTP status mirrors the envelope code.
//!
//! # Endpoints
//!
//! * `GET /health` - liveness (plain `ok`, no auth)
//! * `GET /metrics` - Prometheus text (no auth)
//! * `GET {base}/get` - `{"name":"hello"}`
//! * `POST {base}/upload` - multipart `file` + optional `folder`

use super::AppState;
use crate::auth::AuthRequest;
use crate::envelope::ApiResult;
use crate::metrics;
use crate::router::Route;
use crate::upload::form::{boundary_from_content_type, parse_upload_form, FormError};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

/// Handle one HTTP request
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<String>, Infallible>
where
    B: Body + Send + 'static,
    B::Data: Into<Bytes> + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let route = state.router.resolve(method.as_str(), &path);

    debug!(method = %method, path = %path, route = ?route, "Handling request");

    if route.requires_auth() {
        let auth_request = build_auth_request(&req);
        if let Err(e) = state.authenticator.authenticate(&auth_request).await {
            let mut response = envelope_response(&ApiResult::<()>::fail_with_code(
                e.to_string(),
                StatusCode::UNAUTHORIZED.as_u16(),
            ));
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            return Ok(response);
        }
    }

    let response = match route {
        Route::Health => respond(StatusCode::OK, TEXT, "ok".to_string()),
        Route::Metrics if state.metrics_enabled => {
            respond(StatusCode::OK, PROMETHEUS_TEXT, metrics::gather_text())
        }
        Route::Metrics | Route::NotFound => {
            respond(StatusCode::NOT_FOUND, TEXT, "Not Found".to_string())
        }
        Route::Hello => respond(
            StatusCode::OK,
            JSON,
            serde_json::json!({ "name": "hello" }).to_string(),
        ),
        Route::Upload => handle_upload(req, &state).await,
        Route::ApiError(e) => {
            envelope_response(&ApiResult::<()>::fail_with_code(e.to_string(), e.code()))
        }
    };

    Ok(response)
}

async fn handle_upload<B>(req: Request<B>, state: &AppState) -> Response<String>
where
    B: Body + Send + 'static,
    B::Data: Into<Bytes> + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let boundary = match boundary_from_content_type(content_type.as_deref()) {
        Ok(boundary) => boundary,
        Err(e) => return form_error_response(e),
    };

    let stream = req.into_body().into_data_stream();
    let form = match parse_upload_form(stream, &boundary, state.max_file_size).await {
        Ok(form) => form,
        Err(e) => return form_error_response(e),
    };

    info!(
        file_name = %form.file.name,
        bytes = form.file.size(),
        folder = ?form.folder,
        "Upload request received"
    );

    let result = state
        .forwarder
        .forward(form.file, form.folder.as_deref())
        .await;

    if !result.is_success() {
        warn!(msg = %result.msg, "Upload failed");
    }

    envelope_response(&result)
}

fn form_error_response(e: FormError) -> Response<String> {
    warn!(error = %e, "Rejected upload form");
    metrics::record_error("form");
    envelope_response(&ApiResult::<()>::fail_with_code(e.to_string(), e.code()))
}

/// Build AuthRequest from request headers
fn build_auth_request<B>(req: &Request<B>) -> AuthRequest {
    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_lowercase(), v.to_string());
        }
    }

    AuthRequest {
        headers,
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
    }
}

/// JSON envelope response; HTTP status follows the envelope code
fn envelope_response<T: Serialize>(result: &ApiResult<T>) -> Response<String> {
    let status =
        StatusCode::from_u16(result.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    respond(status, JSON, result.to_json())
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
