//! The `Orchestrator` façade (§9 "one explicit value owning these,
//! constructed at process start and passed by reference").

use crate::collection::CollectionLoop;
use crate::events::{event_channel, Event, EventReceiver, EventSender};
use crate::push::{CommandReceiver, PushCommand, PushTransport, XmrChannel};
use crate::state::PlayerState;
use crate::transport::{PlatformSink, RendererFacing, Transport};
use serde_json::Value;
use signage_download::CacheManager;
use signage_model::FileId;
use signage_schedule::ResolveEnv;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Construction dependencies. Everything here is a capability-bound
/// interface (§9 "dynamic dispatch") so tests can supply fakes.
pub struct OrchestratorDeps {
    pub transport: Arc<dyn Transport>,
    pub renderer: Arc<dyn RendererFacing>,
    pub cache: Arc<CacheManager>,
    pub push_transport: Arc<dyn PushTransport>,
    pub platform_sink: Option<Arc<dyn PlatformSink>>,
}

/// State shared across the orchestrator's background tasks. Kept separate
/// from the join handles so tasks can hold an `Arc<Shared>` without a
/// reference cycle back to `Orchestrator` itself (§9 "cyclic references
/// avoided").
struct Shared {
    state: Arc<Mutex<PlayerState>>,
    collection: Arc<CollectionLoop>,
    push: Arc<XmrChannel>,
    platform_sink: Option<Arc<dyn PlatformSink>>,
    overlay_layout: Mutex<Option<FileId>>,
}

impl Shared {
    async fn run_event_dispatch(&self, mut internal_rx: EventReceiver, platform_tx: EventSender) {
        while let Some(event) = internal_rx.recv().await {
            if let Event::FileReady { file_id, .. } = &event {
                self.scan_pending_layouts(file_id, &platform_tx).await;
            }
            if platform_tx.send(event).is_err() {
                return;
            }
        }
    }

    /// Namespaces are disambiguated by `FileId` equality (`kind` included),
    /// so `file_ready((Layout, 78))` never satisfies a dependency on
    /// `(Media, 78)` (§8 property 6).
    async fn scan_pending_layouts(&self, ready_file: &FileId, platform_tx: &EventSender) {
        let mut newly_ready = Vec::new();
        let mut checked = Vec::new();
        {
            let mut state = self.state.lock().await;
            for (layout, missing) in &mut state.pending_layouts {
                if missing.remove(ready_file) {
                    checked.push((layout.clone(), missing.clone()));
                    if missing.is_empty() {
                        newly_ready.push(layout.clone());
                    }
                }
            }
            for layout in &newly_ready {
                state.pending_layouts.remove(layout);
            }
        }
        for (layout, missing) in checked {
            let _ = platform_tx.send(Event::CheckPendingLayout { file_id: layout, missing });
        }
        for layout in newly_ready {
            info!(file_id = %layout, "pending layout's dependencies all resolved");
            let _ = platform_tx.send(Event::LayoutReady { file_id: layout });
        }
    }

    async fn run_periodic_collection(&self) {
        loop {
            let interval = self.state.lock().await.collection_interval;
            tokio::time::sleep(interval).await;
            self.collection.collect().await;
        }
    }

    async fn run_command_dispatch(&self, mut commands_rx: CommandReceiver) {
        while let Some(command) = commands_rx.recv().await {
            self.handle_command(command).await;
        }
    }

    async fn handle_command(&self, command: PushCommand) {
        match command {
            PushCommand::CollectNow => self.collection.collect().await,
            PushCommand::ChangeLayout(layout_id) => {
                self.state.lock().await.current_layout = None;
                info!(file_id = %layout_id, "push channel forced layout change");
                self.collection.collect().await;
            }
            PushCommand::OverlayLayout(layout_id) => {
                *self.overlay_layout.lock().await = Some(layout_id);
            }
            PushCommand::RevertToSchedule => {
                *self.overlay_layout.lock().await = None;
            }
            PushCommand::PurgeAll => {
                if let Err(e) = self.collection.purge_cache().await {
                    warn!(error = %e, "purge_all failed");
                }
                self.collection.collect().await;
            }
            PushCommand::CommandAction { code, args } => {
                if let Some(sink) = &self.platform_sink {
                    sink.command_action(&code, args).await;
                }
            }
            PushCommand::TriggerWebhook { code } => {
                if let Some(sink) = &self.platform_sink {
                    sink.trigger_webhook(&code).await;
                }
            }
            PushCommand::DataUpdate => {
                info!("data_update received; connectors out of scope for this core");
            }
            PushCommand::Rekey => {
                warn!("rekey requested; credential material refreshes on next register");
                self.collection.collect().await;
            }
            PushCommand::CriteriaUpdate { payload } => {
                self.apply_criteria_update(payload).await;
                self.collection.collect().await;
            }
            PushCommand::CurrentGeoLocation { payload } => {
                self.apply_geo_location(payload).await;
            }
            PushCommand::ScreenShot => {
                if let Some(sink) = &self.platform_sink {
                    sink.screen_shot().await;
                }
            }
            PushCommand::LicenceCheck => {
                if let Some(sink) = &self.platform_sink {
                    sink.licence_check().await;
                }
            }
        }
    }

    async fn apply_criteria_update(&self, payload: Value) {
        let Value::Object(map) = payload else {
            return;
        };
        let mut properties = HashMap::new();
        for (key, value) in map {
            if let Value::String(s) = value {
                properties.insert(key, s);
            }
        }
        self.collection
            .update_env(|env| env.display_properties.extend(properties))
            .await;
    }

    async fn apply_geo_location(&self, payload: Value) {
        let lat = payload.get("lat").and_then(Value::as_f64);
        let lon = payload.get("lon").and_then(Value::as_f64);
        match (lat, lon) {
            (Some(lat), Some(lon)) => {
                self.collection.update_env(|env| env.location = Some((lat, lon))).await;
            }
            _ => {
                if let Some(sink) = &self.platform_sink {
                    sink.poll_geo_location().await;
                }
            }
        }
    }
}

pub struct Orchestrator {
    shared: Arc<Shared>,
    platform_events: EventSender,
    platform_rx: Mutex<Option<EventReceiver>>,
    dispatch_task: StdMutex<Option<JoinHandle<()>>>,
    command_task: StdMutex<Option<JoinHandle<()>>>,
    timer_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        let state = Arc::new(Mutex::new(PlayerState::new()));
        let (internal_tx, internal_rx) = event_channel();
        let (platform_tx, platform_rx) = event_channel();
        let (commands_tx, commands_rx) = tokio::sync::mpsc::unbounded_channel();

        let push = Arc::new(XmrChannel::new(deps.push_transport, internal_tx.clone(), commands_tx));
        let collection = Arc::new(CollectionLoop::new(
            deps.transport,
            deps.renderer,
            deps.cache,
            push.clone(),
            state.clone(),
            ResolveEnv::new(),
            internal_tx,
        ));

        let shared = Arc::new(Shared {
            state,
            collection,
            push,
            platform_sink: deps.platform_sink,
            overlay_layout: Mutex::new(None),
        });

        let dispatch_task = {
            let shared = shared.clone();
            let platform_tx = platform_tx.clone();
            tokio::spawn(async move { shared.run_event_dispatch(internal_rx, platform_tx).await })
        };
        let command_task = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.run_command_dispatch(commands_rx).await })
        };
        let timer_task = {
            let shared = shared.clone();
            tokio::spawn(async move { shared.run_periodic_collection().await })
        };

        Self {
            shared,
            platform_events: platform_tx,
            platform_rx: Mutex::new(Some(platform_rx)),
            dispatch_task: StdMutex::new(Some(dispatch_task)),
            command_task: StdMutex::new(Some(command_task)),
            timer_task: StdMutex::new(Some(timer_task)),
        }
    }

    /// Takes the platform-facing event stream. Can only be taken once.
    pub async fn events(&self) -> Option<EventReceiver> {
        self.platform_rx.lock().await.take()
    }

    pub async fn collect(&self) {
        self.shared.collection.collect().await;
    }

    /// Called by the renderer once it actually starts rendering `file_id`,
    /// committing it as the current layout.
    pub async fn mark_layout_playing(&self, file_id: FileId) {
        self.shared.collection.mark_layout_playing(&file_id).await;
    }

    pub fn state(&self) -> Arc<Mutex<PlayerState>> {
        self.shared.state.clone()
    }

    /// Cancels the periodic timer, stops the push channel (marking it
    /// intentional), and stops forwarding events. In-flight downloads may
    /// complete or abort; no events fire after this returns (§5).
    pub async fn cleanup(&self) {
        if let Some(t) = self.timer_task.lock().unwrap().take() {
            t.abort();
        }
        if let Some(t) = self.command_task.lock().unwrap().take() {
            t.abort();
        }
        self.shared.push.stop().await;
        if let Some(t) = self.dispatch_task.lock().unwrap().take() {
            t.abort();
        }
        let _ = self.platform_events.send(Event::CleanupComplete);
    }
}
