//! HTTP request handling and response construction

use std::time::Instant;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::engine::SimulationEngine;
use crate::LabError;

use super::Route;

/// HTTP handler for processing requests
pub struct HttpHandler;

impl HttpHandler {
    /// Handle one request, turning engine errors into error responses
    pub async fn handle<B>(
        engine: &SimulationEngine,
        request: Request<B>,
    ) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let (parts, body) = request.into_parts();
        drop(body);

        let result = Route::dispatch(engine, &parts.method, &parts.uri, parts.version).await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_client_error() {
                    debug!("Rejected {} {}: {}", parts.method, parts.uri, e);
                } else {
                    warn!("Failed {} {}: {}", parts.method, parts.uri, e);
                }
                Self::error_response(&e)
            }
        };

        debug!(
            "{} {} {:?} -> {} in {:?}",
            parts.method,
            parts.uri,
            parts.version,
            response.status(),
            started.elapsed()
        );

        response
    }

    /// Create an HTTP response with an uncacheable body
    ///
    /// # Panics
    ///
    /// Panics if response builder fails (should never happen with valid inputs)
    #[must_use]
    pub fn create_response(
        status: StatusCode,
        content_type: &'static str,
        body: Bytes,
    ) -> Response<Full<Bytes>> {
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .header(CACHE_CONTROL, HeaderValue::from_static("no-store"))
            .body(Full::new(body))
            .expect("Failed to build response")
    }

    /// Create an error response
    #[must_use]
    pub fn error_response(error: &LabError) -> Response<Full<Bytes>> {
        let status = match error {
            LabError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            LabError::NotFound(_) => StatusCode::NOT_FOUND,
            LabError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            LabError::Interrupted => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self::create_response(
            status,
            "text/plain; charset=utf-8",
            Bytes::from(format!("Error: {error}")),
        )
    }
}
