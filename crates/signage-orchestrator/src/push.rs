//! `PushChannel` (§4.8): a long-lived bidirectional command channel with
//! exponential-backoff reconnection. The reconnect/backoff shape mirrors
//! `ngdp_cdn::CdnClient::calculate_backoff`; the wire protocol itself is a
//! pluggable `PushTransport` so this crate never depends on a specific
//! transport library.

use async_trait::async_trait;
use serde_json::Value;
use signage_model::FileId;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{Event, EventSender};

/// The recognised command set (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub enum PushCommand {
    CollectNow,
    ChangeLayout(FileId),
    OverlayLayout(FileId),
    RevertToSchedule,
    PurgeAll,
    CommandAction { code: String, args: Value },
    TriggerWebhook { code: String },
    DataUpdate,
    Rekey,
    CriteriaUpdate { payload: Value },
    CurrentGeoLocation { payload: Value },
    ScreenShot,
    LicenceCheck,
}

pub type CommandSender = tokio::sync::mpsc::UnboundedSender<PushCommand>;
pub type CommandReceiver = tokio::sync::mpsc::UnboundedReceiver<PushCommand>;

/// One live read side of a push channel connection.
#[async_trait]
pub trait PushConnection: Send {
    async fn recv(&mut self) -> Result<PushCommand>;
}

/// Establishes connections for a given `(url, key)` pair. Implemented by
/// whatever wire protocol the deployment uses (websocket, long-poll, ...);
/// this crate only drives the reconnect state machine around it.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn connect(&self, url: &str, key: &str) -> Result<Box<dyn PushConnection>>;
}

/// The push-channel capability itself (§9 "dynamic dispatch": not to be
/// confused with the concrete [`XmrChannel`] implementation below).
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn start(&self, url: String, key: String);
    async fn stop(&self);
    fn is_connected(&self) -> bool;
}

const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_JITTER_FACTOR: f64 = 0.2;
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// A reconnecting push channel. At most one live connection; reconnection
/// uses linear-to-exponential backoff capped at `max_reconnect_attempts`,
/// after which further attempts happen only when the next collection
/// cycle calls `start` again (§4.8).
pub struct XmrChannel {
    transport: Arc<dyn PushTransport>,
    events: EventSender,
    commands: CommandSender,
    connected: Arc<AtomicBool>,
    intentional_stop: Arc<AtomicBool>,
    max_reconnect_attempts: u32,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl XmrChannel {
    pub fn new(transport: Arc<dyn PushTransport>, events: EventSender, commands: CommandSender) -> Self {
        Self {
            transport,
            events,
            commands,
            connected: Arc::new(AtomicBool::new(false)),
            intentional_stop: Arc::new(AtomicBool::new(false)),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            task: Mutex::new(None),
        }
    }

    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }
}

#[async_trait]
impl PushChannel for XmrChannel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Ensures a connection is live or reconnecting to `url`/`key`.
    /// Re-entrant: a call while already running is a no-op.
    async fn start(&self, url: String, key: String) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        self.intentional_stop.store(false, Ordering::Relaxed);

        let transport = self.transport.clone();
        let events = self.events.clone();
        let commands = self.commands.clone();
        let connected = self.connected.clone();
        let intentional_stop = self.intentional_stop.clone();
        let max_attempts = self.max_reconnect_attempts;

        *task = Some(tokio::spawn(async move {
            reconnect_loop(transport, url, key, events, commands, connected, intentional_stop, max_attempts).await;
        }));
    }

    /// Intentional stop: suppresses the automatic reconnect (§4.8).
    async fn stop(&self) {
        self.intentional_stop.store(true, Ordering::Relaxed);
        self.connected.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn reconnect_loop(
    transport: Arc<dyn PushTransport>,
    url: String,
    key: String,
    events: EventSender,
    commands: CommandSender,
    connected: Arc<AtomicBool>,
    intentional_stop: Arc<AtomicBool>,
    max_attempts: u32,
) {
    let attempt = AtomicU32::new(0);

    loop {
        if intentional_stop.load(Ordering::Relaxed) {
            return;
        }
        let current_attempt = attempt.load(Ordering::Relaxed);
        if current_attempt > max_attempts {
            warn!(max_attempts, "push channel giving up reconnecting until the next collection cycle");
            return;
        }
        if current_attempt > 0 {
            let backoff = calculate_backoff(current_attempt - 1);
            debug!(?backoff, attempt = current_attempt, "push channel reconnect backoff");
            tokio::time::sleep(backoff).await;
        }

        match transport.connect(&url, &key).await {
            Ok(mut conn) => {
                connected.store(true, Ordering::Relaxed);
                if current_attempt == 0 {
                    let _ = events.send(Event::XmrConnected);
                } else {
                    let _ = events.send(Event::XmrReconnected { attempt: current_attempt });
                }
                attempt.store(0, Ordering::Relaxed);

                loop {
                    if intentional_stop.load(Ordering::Relaxed) {
                        connected.store(false, Ordering::Relaxed);
                        return;
                    }
                    match conn.recv().await {
                        Ok(cmd) => {
                            if commands.send(cmd).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "push channel read failed, reconnecting");
                            connected.store(false, Ordering::Relaxed);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, attempt = current_attempt, "push channel connect failed");
            }
        }
        attempt.fetch_add(1, Ordering::Relaxed);
    }
}

/// Exponential backoff with jitter, in the style of
/// `ngdp_cdn::CdnClient::calculate_backoff`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn calculate_backoff(attempt: u32) -> Duration {
    let base = DEFAULT_INITIAL_BACKOFF_MS as f64 * DEFAULT_BACKOFF_MULTIPLIER.powi(attempt as i32);
    let capped = base.min(DEFAULT_MAX_BACKOFF_MS as f64);
    let jitter_range = capped * DEFAULT_JITTER_FACTOR;
    let jitter = rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
    Duration::from_millis((capped + jitter).max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_the_configured_cap() {
        for attempt in 0..20 {
            let d = calculate_backoff(attempt);
            assert!(d.as_millis() <= (DEFAULT_MAX_BACKOFF_MS as f64 * (1.0 + DEFAULT_JITTER_FACTOR)) as u128);
        }
    }
}
