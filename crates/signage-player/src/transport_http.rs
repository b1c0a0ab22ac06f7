//! A JSON-over-HTTP `Transport` implementation. The CMS wire protocol
//! itself (XML envelopes, the real push-channel handshake) is out of
//! scope for this core; this is the thin concrete stand-in the binary
//! wires up so the process is runnable against a compatible endpoint.

use async_trait::async_trait;
use signage_model::{FileId, RequiredFileDescriptor, ScheduleModel};
use signage_orchestrator::{Error, PlayerSettings, RegisterResponse, Result, Transport};
use std::time::Duration;

pub struct HttpTransport {
    client: reqwest::Client,
    cms_url: String,
    cms_key: String,
    hardware_key: String,
}

impl HttpTransport {
    pub fn new(cms_url: String, cms_key: String, hardware_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            cms_url,
            cms_key,
            hardware_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.cms_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn register(&self) -> Result<RegisterResponse> {
        #[derive(serde::Deserialize)]
        struct Wire {
            collection_interval_secs: u64,
            log_level: Option<String>,
            xmr_url: String,
            xmr_key: String,
        }

        let wire: Wire = self
            .client
            .post(self.endpoint("register"))
            .timeout(Duration::from_secs(10))
            .json(&serde_json::json!({
                "cms_key": self.cms_key,
                "hardware_key": self.hardware_key,
            }))
            .send()
            .await
            .map_err(|e| Error::transport(format!("register: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("register: {e}")))?
            .json()
            .await
            .map_err(|e| Error::transport(format!("register: decoding response: {e}")))?;

        Ok(RegisterResponse {
            settings: PlayerSettings {
                collection_interval: Duration::from_secs(wire.collection_interval_secs),
                log_level: wire.log_level,
            },
            xmr_url: wire.xmr_url,
            xmr_key: wire.xmr_key,
        })
    }

    async fn required_files(&self) -> Result<Vec<RequiredFileDescriptor>> {
        self.client
            .get(self.endpoint("required_files"))
            .timeout(Duration::from_secs(30))
            .query(&[("hardware_key", &self.hardware_key)])
            .send()
            .await
            .map_err(|e| Error::transport(format!("required_files: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("required_files: {e}")))?
            .json()
            .await
            .map_err(|e| Error::transport(format!("required_files: decoding response: {e}")))
    }

    async fn schedule(&self) -> Result<ScheduleModel> {
        self.client
            .get(self.endpoint("schedule"))
            .timeout(Duration::from_secs(10))
            .query(&[("hardware_key", &self.hardware_key)])
            .send()
            .await
            .map_err(|e| Error::transport(format!("schedule: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("schedule: {e}")))?
            .json()
            .await
            .map_err(|e| Error::transport(format!("schedule: decoding response: {e}")))
    }

    async fn get_resource(&self, layout: &FileId, region: &str, widget: &str) -> Result<String> {
        self.client
            .get(self.endpoint("resource"))
            .query(&[
                ("layout", layout.id.to_string()),
                ("region", region.to_string()),
                ("widget", widget.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::transport(format!("get_resource: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("get_resource: {e}")))?
            .text()
            .await
            .map_err(|e| Error::transport(format!("get_resource: decoding response: {e}")))
    }

    async fn notify_status(&self, file_id: &FileId) -> Result<()> {
        self.client
            .post(self.endpoint("notify_status"))
            .json(&serde_json::json!({ "file_id": file_id.to_string() }))
            .send()
            .await
            .map_err(|e| Error::transport(format!("notify_status: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("notify_status: {e}")))?;
        Ok(())
    }

    async fn submit_stats(&self, payload: serde_json::Value) -> Result<()> {
        self.client
            .post(self.endpoint("submit_stats"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("submit_stats: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("submit_stats: {e}")))?;
        Ok(())
    }

    async fn submit_log(&self, payload: String) -> Result<()> {
        self.client
            .post(self.endpoint("submit_log"))
            .body(payload)
            .send()
            .await
            .map_err(|e| Error::transport(format!("submit_log: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("submit_log: {e}")))?;
        Ok(())
    }

    async fn submit_screenshot(&self, bytes: Vec<u8>) -> Result<()> {
        self.client
            .post(self.endpoint("submit_screenshot"))
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::transport(format!("submit_screenshot: {e}")))?
            .error_for_status()
            .map_err(|e| Error::transport(format!("submit_screenshot: {e}")))?;
        Ok(())
    }
}
