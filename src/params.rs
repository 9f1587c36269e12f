//! Query parameter resolution
//!
//! Turns the raw, optional query values of a request into a [`RequestConfig`].
//! Numeric parameters that do not parse are client errors; enum parameters
//! fall back to their defaults unless [`EnumPolicy::Strict`] is in effect.

use std::borrow::Cow;
use std::fmt;

use crate::{LabError, Result};

/// Size used for endpoints that do not synthesize a sized payload
pub const NO_PAYLOAD_KB: u32 = 0;

/// How unrecognized enum values are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPolicy {
    /// Map to the default variant
    #[default]
    FailOpen,
    /// Reject with [`LabError::InvalidParameter`]
    Strict,
}

/// Transport protocol being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// HTTP/2 over TCP
    #[default]
    Http2,
    /// HTTP/3 over QUIC
    Http3,
}

impl Protocol {
    /// Wire name used in query strings and responses
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http2 => "http2",
            Self::Http3 => "http3",
        }
    }

    /// Resolve an optional raw value
    ///
    /// # Errors
    ///
    /// Returns error only under [`EnumPolicy::Strict`] for unknown values
    pub fn resolve(raw: Option<&str>, policy: EnumPolicy) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        match raw.to_lowercase().as_str() {
            "http3" => Ok(Self::Http3),
            "http2" => Ok(Self::Http2),
            _ if policy == EnumPolicy::Strict => {
                Err(LabError::invalid_parameter("protocol", raw))
            }
            _ => Ok(Self::default()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated network condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// Local wireless network
    #[default]
    Wifi,
    /// 5G cellular
    FiveG,
    /// Degraded 3G cellular
    Slow3g,
}

impl Condition {
    /// Wire name used in query strings and responses
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wifi => "wifi",
            Self::FiveG => "5g",
            Self::Slow3g => "slow3g",
        }
    }

    /// Resolve an optional raw value
    ///
    /// # Errors
    ///
    /// Returns error only under [`EnumPolicy::Strict`] for unknown values
    pub fn resolve(raw: Option<&str>, policy: EnumPolicy) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        match raw.to_lowercase().as_str() {
            "5g" => Ok(Self::FiveG),
            "slow3g" => Ok(Self::Slow3g),
            "wifi" => Ok(Self::Wifi),
            _ if policy == EnumPolicy::Strict => {
                Err(LabError::invalid_parameter("condition", raw))
            }
            _ => Ok(Self::default()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of synthetic resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Stylesheet text
    Css,
    /// Script text
    Js,
    /// Binary image bytes
    Image,
}

impl ContentKind {
    /// Size substituted when `size` is absent or not positive
    #[must_use]
    pub fn default_size_kb(self) -> u32 {
        match self {
            Self::Css => 2,
            Self::Js => 4,
            Self::Image => 16,
        }
    }

    /// `Content-Type` header value
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Css => "text/css",
            Self::Js => "application/javascript",
            Self::Image => "application/octet-stream",
        }
    }

    /// Parse a path segment (`css`, `js`, `image`)
    #[must_use]
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "css" => Some(Self::Css),
            "js" => Some(Self::Js),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Raw query values as received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    /// `id` parameter
    pub id: Option<String>,
    /// `size` parameter, in KB
    pub size: Option<String>,
    /// `protocol` parameter
    pub protocol: Option<String>,
    /// `condition` parameter
    pub condition: Option<String>,
}

impl ResourceQuery {
    /// Parse a URI query string
    ///
    /// Unknown keys are ignored; for repeated keys the first occurrence wins.
    /// Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidParameter`] if a key or value is not valid
    /// percent-encoded UTF-8
    pub fn parse(query: Option<&str>) -> Result<Self> {
        let mut parsed = Self::default();

        for pair in query.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)?;
            let value = decode_component(value)?;

            if value.is_empty() {
                continue;
            }

            let slot = match key.as_str() {
                "id" => &mut parsed.id,
                "size" => &mut parsed.size,
                "protocol" => &mut parsed.protocol,
                "condition" => &mut parsed.condition,
                _ => continue,
            };

            if slot.is_none() {
                *slot = Some(value);
            }
        }

        Ok(parsed)
    }
}

fn decode_component(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|_| LabError::invalid_parameter("query", raw))
}

/// Validated per-request configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestConfig {
    /// Opaque echo value
    pub id: Option<i32>,
    /// Payload size in KB after default substitution
    pub size_kb: u32,
    /// Simulated transport
    pub protocol: Protocol,
    /// Simulated network condition
    pub condition: Condition,
}

/// Resolves raw query values into a [`RequestConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterResolver {
    policy: EnumPolicy,
}

impl ParameterResolver {
    /// Create a resolver with the given enum policy
    #[must_use]
    pub fn new(policy: EnumPolicy) -> Self {
        Self { policy }
    }

    /// Enum policy in effect
    #[must_use]
    pub fn policy(&self) -> EnumPolicy {
        self.policy
    }

    /// Resolve a query, substituting `default_size_kb` for a missing or
    /// non-positive `size`
    ///
    /// # Errors
    ///
    /// Returns error if `id` or `size` is not an integer, or if an enum value
    /// is unrecognized under [`EnumPolicy::Strict`]
    pub fn resolve(&self, query: &ResourceQuery, default_size_kb: u32) -> Result<RequestConfig> {
        Ok(RequestConfig {
            protocol: Protocol::resolve(query.protocol.as_deref(), self.policy)?,
            condition: Condition::resolve(query.condition.as_deref(), self.policy)?,
            ..Self::resolve_resource(query, default_size_kb)?
        })
    }

    /// Resolve only `id` and `size`, for endpoints that take no
    /// `protocol`/`condition`
    ///
    /// Those keys are ignored, so the enum policy never applies here.
    ///
    /// # Errors
    ///
    /// Returns error if `id` or `size` is not an integer
    pub fn resolve_resource(query: &ResourceQuery, default_size_kb: u32) -> Result<RequestConfig> {
        let id = parse_int("id", query.id.as_deref())?;
        let size = parse_int("size", query.size.as_deref())?;

        let size_kb = match size {
            Some(kb) if kb > 0 => kb.unsigned_abs(),
            _ => default_size_kb,
        };

        Ok(RequestConfig {
            id,
            size_kb,
            protocol: Protocol::default(),
            condition: Condition::default(),
        })
    }
}

fn parse_int(name: &'static str, raw: Option<&str>) -> Result<Option<i32>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<i32>()
            .map_err(|_| LabError::invalid_parameter(name, value))
    })
    .transpose()
}
