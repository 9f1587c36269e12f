//! Path routing

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, Uri, Version};

use crate::engine::SimulationEngine;
use crate::params::{ContentKind, ResourceQuery};
use crate::response::{self, ResponseAssembler};
use crate::{LabError, Result};

use super::HttpHandler;

const JSON: &str = "application/json";

/// Endpoints served by Latlab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/api/resource/{css,js,image}`
    Resource(ContentKind),
    /// `/api/resource/api/fast`
    FastApi,
    /// `/api/resource/api/fast/legacy`
    LegacyFastApi,
    /// `/api/resource/api/slow`
    SlowApi,
    /// `/api/health`
    Health,
    /// `/api/protocol`
    Protocol,
}

impl Route {
    /// Match a request path, ignoring one trailing slash
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.strip_suffix('/').unwrap_or(path);

        match path {
            "/api/health" => Some(Self::Health),
            "/api/protocol" => Some(Self::Protocol),
            "/api/resource/api/fast" => Some(Self::FastApi),
            "/api/resource/api/fast/legacy" => Some(Self::LegacyFastApi),
            "/api/resource/api/slow" => Some(Self::SlowApi),
            _ => path
                .strip_prefix("/api/resource/")
                .and_then(ContentKind::from_segment)
                .map(Self::Resource),
        }
    }

    /// Run the route against the engine
    ///
    /// # Errors
    ///
    /// Returns error for unknown paths, non-GET methods, malformed
    /// parameters, or shutdown during the simulated delay
    pub async fn dispatch(
        engine: &SimulationEngine,
        method: &Method,
        uri: &Uri,
        version: Version,
    ) -> Result<Response<Full<Bytes>>> {
        let route =
            Self::from_path(uri.path()).ok_or_else(|| LabError::NotFound(uri.path().to_string()))?;

        if *method != Method::GET {
            return Err(LabError::MethodNotAllowed(method.to_string()));
        }

        // Parsed only by the routes that take parameters.
        let query = || ResourceQuery::parse(uri.query());

        let (content_type, body) = match route {
            Self::Resource(kind) => {
                let resource = engine.resource(kind, &query()?).await?;
                (resource.content_type, resource.body)
            }
            Self::FastApi => (JSON, response::to_json(&engine.fast_api(&query()?).await?)?),
            Self::LegacyFastApi => (
                JSON,
                response::to_json(&engine.legacy_fast_api(&query()?).await?)?,
            ),
            Self::SlowApi => (JSON, response::to_json(&engine.slow_api(&query()?).await?)?),
            Self::Health => (JSON, response::to_json(&ResponseAssembler::health())?),
            Self::Protocol => (
                JSON,
                response::to_json(&ResponseAssembler::protocol(format!("{version:?}")))?,
            ),
        };

        Ok(HttpHandler::create_response(
            hyper::StatusCode::OK,
            content_type,
            body,
        ))
    }
}
