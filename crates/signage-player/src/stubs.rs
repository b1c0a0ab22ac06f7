//! Stand-ins for the collaborators the spec explicitly excludes from the
//! core: the visual renderer and the platform-delegated command sinks.
//! A concrete player pairs this crate with a real renderer and platform
//! integration instead of these.

use async_trait::async_trait;
use signage_model::{FileId, LayoutDescriptor};
use signage_orchestrator::{PlatformSink, PushConnection, PushTransport, RendererFacing, Result};
use tracing::{info, warn};

/// Reports every layout as dependency-free. A real renderer would parse
/// `bytes` for its media/widget references.
pub struct NoopRenderer;

impl RendererFacing for NoopRenderer {
    fn parse_layout(&self, file_id: &FileId, bytes: Vec<u8>) -> Result<LayoutDescriptor> {
        Ok(LayoutDescriptor::new(file_id.clone(), bytes, Vec::new()))
    }
}

/// Logs platform-delegated commands instead of acting on them.
pub struct LoggingPlatformSink;

#[async_trait]
impl PlatformSink for LoggingPlatformSink {
    async fn command_action(&self, code: &str, args: serde_json::Value) {
        info!(code, ?args, "command_action (no platform sink configured)");
    }

    async fn trigger_webhook(&self, code: &str) {
        info!(code, "trigger_webhook (no platform sink configured)");
    }

    async fn screen_shot(&self) {
        info!("screen_shot requested (no platform sink configured)");
    }

    async fn licence_check(&self) {
        info!("licence_check requested (no platform sink configured)");
    }

    async fn poll_geo_location(&self) {
        info!("geo location poll requested (no platform sink configured)");
    }
}

/// A push transport with nowhere to connect. `XmrChannel`'s own backoff
/// and give-up-until-next-cycle behaviour handles this the same as a real
/// but unreachable endpoint.
pub struct UnconfiguredPushTransport;

#[async_trait]
impl PushTransport for UnconfiguredPushTransport {
    async fn connect(&self, url: &str, _key: &str) -> Result<Box<dyn PushConnection>> {
        warn!(url, "no push channel transport configured");
        Err(signage_orchestrator::Error::push_channel(
            "no push channel transport configured",
        ))
    }
}
