//! External collaborator contracts (§6): `Transport` and `RendererFacing`.
//! Concrete wire-protocol and rendering implementations live outside this
//! crate; it only needs the shapes they return.

use crate::error::Result;
use async_trait::async_trait;
use signage_model::{FileId, LayoutDescriptor, RequiredFileDescriptor, ScheduleModel};
use std::time::Duration;

/// Settings returned by `register`, applied to `PlayerState`.
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub collection_interval: Duration,
    pub log_level: Option<String>,
}

/// `register`'s result: settings plus the push-channel's connection
/// details.
#[derive(Debug, Clone)]
pub struct RegisterResponse {
    pub settings: PlayerSettings,
    pub xmr_url: String,
    pub xmr_key: String,
}

/// The CMS wire protocol, consumed but not defined here (§1 out-of-scope,
/// §6). A failed call must raise an error, never a silent success.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn register(&self) -> Result<RegisterResponse>;
    async fn required_files(&self) -> Result<Vec<RequiredFileDescriptor>>;
    async fn schedule(&self) -> Result<ScheduleModel>;
    async fn get_resource(&self, layout: &FileId, region: &str, widget: &str) -> Result<String>;
    async fn notify_status(&self, file_id: &FileId) -> Result<()>;
    async fn submit_stats(&self, payload: serde_json::Value) -> Result<()>;
    async fn submit_log(&self, payload: String) -> Result<()>;
    async fn submit_screenshot(&self, bytes: Vec<u8>) -> Result<()>;
}

/// The renderer-facing seam (§1 out-of-scope): parses a layout's raw bytes
/// into its declared dependency set so the core can decide readiness
/// (§4.7 step 7) without interpreting the layout format itself.
pub trait RendererFacing: Send + Sync {
    fn parse_layout(&self, file_id: &FileId, bytes: Vec<u8>) -> Result<LayoutDescriptor>;
}

/// Platform-delegated command handlers (§4.8: `command_action`,
/// `trigger_webhook`, `screen_shot`, `licence_check`, and the geolocation
/// poll request when `current_geo_location` carries no coordinates). The
/// core merely routes; it never interprets these payloads.
#[async_trait]
pub trait PlatformSink: Send + Sync {
    async fn command_action(&self, code: &str, args: serde_json::Value);
    async fn trigger_webhook(&self, code: &str);
    async fn screen_shot(&self);
    async fn licence_check(&self);
    async fn poll_geo_location(&self);
}
