//! JSON response bodies

use std::time::SystemTime;

use bytes::Bytes;
use serde::Serialize;

use crate::latency::LatencyResult;
use crate::params::RequestConfig;
use crate::{LabError, Result};

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> SystemTime;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Which comparison endpoint produced a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKind {
    /// Fast endpoint
    Fast,
    /// Slow endpoint
    Slow,
}

/// Body of the condition-aware fast endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastApiBody {
    /// Always [`ApiKind::Fast`]
    #[serde(rename = "type")]
    pub kind: ApiKind,
    /// Simulated protocol
    pub protocol: &'static str,
    /// Simulated condition
    pub condition: &'static str,
    /// Delay before jitter
    pub configured_delay_ms: u64,
    /// Delay actually applied
    pub measured_latency_ms: u64,
    /// Echoed id
    pub id: Option<i32>,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

/// Body of the fixed-delay endpoints (slow and legacy fast)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicApiBody {
    /// Endpoint kind
    #[serde(rename = "type")]
    pub kind: ApiKind,
    /// Echoed id
    pub id: Option<i32>,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

/// Health check body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthBody {
    /// Always `ok`
    pub status: &'static str,
}

/// Negotiated transport echo body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolBody {
    /// e.g. `HTTP/1.1`, `HTTP/2.0`
    pub protocol: String,
}

/// Builds response bodies, stamping them with the injected clock
pub struct ResponseAssembler {
    clock: Box<dyn Clock>,
}

impl ResponseAssembler {
    /// Create an assembler using `clock` for timestamps
    #[must_use]
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
        }
    }

    /// Current time as RFC 3339 with millisecond precision
    #[must_use]
    pub fn timestamp(&self) -> String {
        humantime::format_rfc3339_millis(self.clock.now()).to_string()
    }

    /// Body for the condition-aware fast endpoint
    #[must_use]
    pub fn fast(&self, config: &RequestConfig, latency: &LatencyResult) -> FastApiBody {
        FastApiBody {
            kind: ApiKind::Fast,
            protocol: config.protocol.as_str(),
            condition: config.condition.as_str(),
            configured_delay_ms: latency.configured_delay_ms,
            measured_latency_ms: latency.measured_latency_ms(),
            id: config.id,
            timestamp: self.timestamp(),
        }
    }

    /// Body for the slow endpoint
    #[must_use]
    pub fn slow(&self, id: Option<i32>) -> BasicApiBody {
        self.basic(ApiKind::Slow, id)
    }

    /// Body for the legacy fixed-delay fast endpoint
    #[must_use]
    pub fn legacy_fast(&self, id: Option<i32>) -> BasicApiBody {
        self.basic(ApiKind::Fast, id)
    }

    fn basic(&self, kind: ApiKind, id: Option<i32>) -> BasicApiBody {
        BasicApiBody {
            kind,
            id,
            timestamp: self.timestamp(),
        }
    }

    /// Health check body
    #[must_use]
    pub fn health() -> HealthBody {
        HealthBody { status: "ok" }
    }

    /// Transport echo body
    #[must_use]
    pub fn protocol(protocol: impl Into<String>) -> ProtocolBody {
        ProtocolBody {
            protocol: protocol.into(),
        }
    }
}

impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

/// Serialize a body to JSON bytes
///
/// # Errors
///
/// Returns error if serialization fails
pub fn to_json<T: Serialize>(body: &T) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| LabError::Other(format!("Failed to serialize response: {e}")))
}
