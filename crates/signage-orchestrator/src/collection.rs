//! `CollectionLoop` (§4.7): the periodic collection cycle.

use crate::error::{Error, Result};
use crate::events::{Event, EventSender};
use crate::priority_order::order_downloads;
use crate::push::XmrChannel;
use crate::state::PlayerState;
use crate::transport::{RendererFacing, Transport};
use chrono::Utc;
use signage_download::CacheManager;
use signage_model::{FileId, RequiredFileDescriptor, ScheduleModel, ScheduledLayout};
use signage_schedule::{resolve, PlayCounter, ResolveEnv};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct CollectionLoop {
    transport: Arc<dyn Transport>,
    renderer: Arc<dyn RendererFacing>,
    cache: Arc<CacheManager>,
    push: Arc<XmrChannel>,
    state: Arc<Mutex<PlayerState>>,
    model: Mutex<Option<ScheduleModel>>,
    env: Mutex<ResolveEnv>,
    play_counter: Mutex<PlayCounter>,
    layout_deps: Mutex<HashMap<FileId, Vec<FileId>>>,
    /// The most recently resolved main layouts, kept so `mark_layout_playing`
    /// can look up the `schedule_id` a committed `FileId` belongs to.
    last_main_layouts: Mutex<Vec<ScheduledLayout>>,
    events: EventSender,
}

impl CollectionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn RendererFacing>,
        cache: Arc<CacheManager>,
        push: Arc<XmrChannel>,
        state: Arc<Mutex<PlayerState>>,
        env: ResolveEnv,
        events: EventSender,
    ) -> Self {
        Self {
            transport,
            renderer,
            cache,
            push,
            state,
            model: Mutex::new(None),
            env: Mutex::new(env),
            play_counter: Mutex::new(PlayCounter::new()),
            layout_deps: Mutex::new(HashMap::new()),
            last_main_layouts: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Runs one collection cycle. Re-entrant calls while one is already in
    /// progress return immediately (§4.7, §5 "non-reentrant").
    pub async fn collect(&self) {
        {
            let mut state = self.state.lock().await;
            if state.collecting {
                return;
            }
            state.collecting = true;
        }
        let _ = self.events.send(Event::CollectionStart);

        if let Err(e) = self.run_cycle().await {
            warn!(error = %e, "collection cycle failed");
            let _ = self.events.send(Event::CollectionError { message: e.to_string() });
        }

        let mut state = self.state.lock().await;
        state.collecting = false;
        drop(state);
        let _ = self.events.send(Event::CollectionComplete);
    }

    async fn run_cycle(&self) -> Result<()> {
        // Step 2: register, apply settings.
        let register = self
            .transport
            .register()
            .await
            .map_err(|e| Error::transport(format!("register: {e}")))?;
        let _ = self.events.send(Event::RegisterComplete);

        let previous_interval = {
            let mut state = self.state.lock().await;
            let previous = state.collection_interval;
            state.collection_interval = register.settings.collection_interval;
            previous
        };
        let _ = self.events.send(Event::CollectionIntervalSet {
            seconds: register.settings.collection_interval.as_secs(),
        });
        if previous_interval != register.settings.collection_interval {
            let _ = self.events.send(Event::CollectionIntervalUpdated {
                seconds: register.settings.collection_interval.as_secs(),
            });
        }
        if let Some(level) = register.settings.log_level.clone() {
            let _ = self.events.send(Event::LogLevelChanged { level });
        }

        // Step 3: ensure the push channel is connected (or reconnecting).
        self.push.start(register.xmr_url.clone(), register.xmr_key.clone()).await;

        // Step 4: required files.
        let descriptors = self
            .transport
            .required_files()
            .await
            .map_err(|e| Error::transport(format!("required_files: {e}")))?;
        let _ = self.events.send(Event::FilesReceived { count: descriptors.len() });

        // Step 5: schedule.
        let model = self
            .transport
            .schedule()
            .await
            .map_err(|e| Error::transport(format!("schedule: {e}")))?;
        let _ = self.events.send(Event::ScheduleReceived);

        // Step 6: resolve, order downloads, hand to CacheManager.
        let now = Utc::now();
        let env = self.env.lock().await.clone();
        let counter = self.play_counter.lock().await.clone();
        let output = resolve(&model, now, &env, &counter);
        let _ = self.events.send(Event::LayoutsScheduled { count: output.main_layouts.len() });
        *self.last_main_layouts.lock().await = output.main_layouts.clone();

        let main_ids: Vec<FileId> = output.main_layouts.iter().map(|l| l.file_id.clone()).collect();
        let deps_snapshot = self.layout_deps.lock().await.clone();
        let ordered = order_downloads(&main_ids, &deps_snapshot, descriptors);
        self.dispatch_downloads(ordered);

        *self.model.lock().await = Some(model);

        // Step 7: first main layout readiness.
        match output.main_layouts.first() {
            Some(first) => self.evaluate_first_layout(&first.file_id).await?,
            None => {
                // Step 8: defensive branch; `resolve` always falls back to
                // the default layout, so this should be unreachable.
                let mut state = self.state.lock().await;
                if state.current_layout.take().is_some() {
                    let _ = self.events.send(Event::LayoutCleared);
                }
                let _ = self.events.send(Event::NoLayoutsScheduled);
            }
        }

        // Step 9: stats cadence, once per cycle.
        let _ = self.events.send(Event::SubmitStatsRequest);
        let stats = self.cache.stats();
        let payload = serde_json::json!({
            "cache_used_bytes": stats.cache_used_bytes,
            "cache_budget_bytes": stats.cache_budget_bytes,
            "in_flight": stats.in_flight,
        });
        if let Err(e) = self.transport.submit_stats(payload).await {
            warn!(error = %e, "submit_stats failed");
        }

        Ok(())
    }

    fn dispatch_downloads(&self, descriptors: Vec<RequiredFileDescriptor>) {
        for descriptor in descriptors {
            let _ = self.events.send(Event::DownloadRequest { file_id: descriptor.file_id.clone() });
            let cache = self.cache.clone();
            let transport = self.transport.clone();
            let events = self.events.clone();
            let file_id = descriptor.file_id.clone();
            tokio::spawn(async move {
                match cache.fetch(descriptor).await {
                    Ok(()) => {
                        let _ = events.send(Event::FileReady { file_id: file_id.clone(), kind: file_id.kind });
                        match transport.notify_status(&file_id).await {
                            Ok(()) => {
                                let _ = events.send(Event::StatusNotified { file_id: file_id.clone() });
                            }
                            Err(e) => {
                                let _ = events.send(Event::StatusNotifyFailed {
                                    file_id: file_id.clone(),
                                    error: e.to_string(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        warn!(file_id = %file_id, error = %e, "download failed, retried next cycle");
                    }
                }
            });
        }
    }

    async fn evaluate_first_layout(&self, file_id: &FileId) -> Result<()> {
        let _ = self.events.send(Event::LayoutPrepareRequest { file_id: file_id.clone() });

        let already_playing = {
            let state = self.state.lock().await;
            state.current_layout.as_ref() == Some(file_id)
        };
        if already_playing {
            let _ = self.events.send(Event::LayoutAlreadyPlaying { file_id: file_id.clone() });
            return Ok(());
        }

        let deps = self.dependency_set(file_id).await?;
        let mut missing = HashSet::new();
        for dep in &deps {
            if !self.cache.exists(dep).await.map_err(|e| Error::cache(dep.clone(), Arc::new(e)))? {
                missing.insert(dep.clone());
            }
        }

        if missing.is_empty() {
            info!(file_id = %file_id, "all dependencies resolvable");
            let _ = self.events.send(Event::LayoutReady { file_id: file_id.clone() });
        } else {
            self.state.lock().await.pending_layouts.insert(file_id.clone(), missing.clone());
            let _ = self.events.send(Event::LayoutPending { file_id: file_id.clone(), missing });
        }
        Ok(())
    }

    /// Layout dependencies, parsed and cached on first availability. Until
    /// the layout file itself is cached, it is its own only known
    /// dependency — the set refines once it downloads and gets parsed.
    async fn dependency_set(&self, file_id: &FileId) -> Result<Vec<FileId>> {
        if let Some(deps) = self.layout_deps.lock().await.get(file_id).cloned() {
            return Ok(deps);
        }
        let bytes = self
            .cache
            .read_whole(file_id)
            .await
            .map_err(|e| Error::cache(file_id.clone(), Arc::new(e)))?;
        match bytes {
            Some(bytes) => {
                let descriptor = self.renderer.parse_layout(file_id, bytes.to_vec())?;
                self.layout_deps
                    .lock()
                    .await
                    .insert(file_id.clone(), descriptor.dependencies.clone());
                Ok(descriptor.dependencies)
            }
            None => Ok(vec![file_id.clone()]),
        }
    }

    pub async fn update_env<F: FnOnce(&mut ResolveEnv)>(&self, f: F) {
        f(&mut self.env.lock().await);
    }

    pub async fn current_model(&self) -> Option<ScheduleModel> {
        self.model.lock().await.clone()
    }

    /// `purge_all` command handler (§4.8 `purge_all`): drops every cached
    /// blob and its in-memory chunk cache; a subsequent `collect()`
    /// re-downloads everything the schedule still requires.
    pub async fn purge_cache(&self) -> signage_download::Result<()> {
        self.cache.purge_all().await
    }

    /// Commits `file_id` as the layout the renderer has actually started
    /// playing, and records the play against its `schedule_id` for
    /// `maxPlaysPerHour` throttling.
    pub async fn mark_layout_playing(&self, file_id: &FileId) {
        {
            let mut state = self.state.lock().await;
            state.current_layout = Some(file_id.clone());
        }
        let _ = self.events.send(Event::LayoutCurrent { file_id: file_id.clone() });

        let schedule_id = self
            .last_main_layouts
            .lock()
            .await
            .iter()
            .find(|l| &l.file_id == file_id)
            .map(|l| l.schedule_id);
        if let Some(schedule_id) = schedule_id {
            self.play_counter.lock().await.record_play(schedule_id, Utc::now());
        }
    }
}
