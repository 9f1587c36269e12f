//! Simulation engine
//!
//! Each operation resolves its query, waits out the simulated delay, then
//! builds the body. The wait is a tokio timer, so it only holds up the
//! request that issued it. Once the server is marked stopped, any wait
//! (pending or new) fails the request with [`LabError::Interrupted`].

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::latency::{FixedDelay, FixedJitter, LatencyModel, ThreadRngJitter};
use crate::params::{ContentKind, ParameterResolver, ResourceQuery, NO_PAYLOAD_KB};
use crate::payload;
use crate::response::{BasicApiBody, FastApiBody, ResponseAssembler, SystemClock};
use crate::{LabError, Result};

impl From<ContentKind> for FixedDelay {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Css => Self::Css,
            ContentKind::Js => Self::Js,
            ContentKind::Image => Self::Image,
        }
    }
}

/// A synthesized resource ready to send
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    /// `Content-Type` header value
    pub content_type: &'static str,
    /// Payload bytes
    pub body: Bytes,
}

/// Composes parameter resolution, latency and body generation
pub struct SimulationEngine {
    resolver: ParameterResolver,
    latency: LatencyModel,
    assembler: ResponseAssembler,
    stopped: watch::Receiver<bool>,
}

impl SimulationEngine {
    /// Create an engine from explicit capabilities
    #[must_use]
    pub fn new(
        resolver: ParameterResolver,
        latency: LatencyModel,
        assembler: ResponseAssembler,
        stopped: watch::Receiver<bool>,
    ) -> Self {
        Self {
            resolver,
            latency,
            assembler,
            stopped,
        }
    }

    /// Create an engine with the system clock and thread-local jitter
    #[must_use]
    pub fn from_config(config: &SimulationConfig, stopped: watch::Receiver<bool>) -> Self {
        let latency = if config.jitter {
            LatencyModel::new(ThreadRngJitter)
        } else {
            LatencyModel::new(FixedJitter::new(0))
        };

        Self::new(
            ParameterResolver::new(config.enum_policy()),
            latency,
            ResponseAssembler::new(SystemClock),
            stopped,
        )
    }

    /// Synthetic stylesheet, script or image after its fixed delay
    ///
    /// # Errors
    ///
    /// Returns error on malformed numeric parameters or shutdown
    pub async fn resource(
        &self,
        kind: ContentKind,
        query: &ResourceQuery,
    ) -> Result<ResourceResponse> {
        let config = ParameterResolver::resolve_resource(query, kind.default_size_kb())?;
        self.suspend(FixedDelay::from(kind).duration()).await?;

        let body = payload::synthesize(kind, config.id, config.size_kb).into_bytes();
        debug!(
            "Synthesized {:?} payload: {} bytes (requested {}KB)",
            kind,
            body.len(),
            config.size_kb
        );

        Ok(ResourceResponse {
            content_type: kind.content_type(),
            body,
        })
    }

    /// Condition-aware fast API
    ///
    /// # Errors
    ///
    /// Returns error on malformed parameters or shutdown
    pub async fn fast_api(&self, query: &ResourceQuery) -> Result<FastApiBody> {
        let config = self.resolver.resolve(query, NO_PAYLOAD_KB)?;
        let latency = self.latency.compute(config.protocol, config.condition);

        debug!(
            "Simulating {} over {}: {}ms + {}ms jitter",
            config.protocol, config.condition, latency.configured_delay_ms, latency.jitter_ms
        );

        self.suspend(latency.duration()).await?;
        Ok(self.assembler.fast(&config, &latency))
    }

    /// Fixed 2s slow API
    ///
    /// # Errors
    ///
    /// Returns error on malformed `id` or shutdown
    pub async fn slow_api(&self, query: &ResourceQuery) -> Result<BasicApiBody> {
        let config = ParameterResolver::resolve_resource(query, NO_PAYLOAD_KB)?;
        self.suspend(FixedDelay::SlowApi.duration()).await?;
        Ok(self.assembler.slow(config.id))
    }

    /// Fixed 30ms fast API, without the condition model
    ///
    /// # Errors
    ///
    /// Returns error on malformed `id` or shutdown
    pub async fn legacy_fast_api(&self, query: &ResourceQuery) -> Result<BasicApiBody> {
        let config = ParameterResolver::resolve_resource(query, NO_PAYLOAD_KB)?;
        self.suspend(FixedDelay::FastLegacyApi.duration()).await?;
        Ok(self.assembler.legacy_fast(config.id))
    }

    async fn suspend(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = wait_stopped(self.stopped.clone()) => Err(LabError::Interrupted),
        }
    }
}

/// Resolve once the flag is `true`; never resolve if its sender is dropped
pub(crate) async fn wait_stopped(mut stopped: watch::Receiver<bool>) {
    if stopped.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
