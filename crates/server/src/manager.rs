//! The cache manager: impure driver of the lifecycle state machine.
//!
//! `Manager` owns the store handle, the fetcher, the lifecycle state and the
//! shared current-generation pointer. `dispatch` feeds events through the
//! pure `transition` function and runs the returned effects; effects may
//! yield follow-up events, which keeps the whole install/activate sequence a
//! single loop.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

use larder_client::{FetchedResponse, Fetcher};
use larder_core::cache::hash::compute_request_key;
use larder_core::lifecycle::{Effect, Event, LifecycleState, transition};
use larder_core::snapshot::retain_headers;
use larder_core::{Error, GenerationStore, Manifest, Snapshot};

/// Build the stored snapshot for one fetched response.
///
/// The entry is keyed by the *requested* URL, so a later interception of the
/// same target looks it up without knowing where redirects would have led.
pub(crate) fn snapshot_from_response(requested: &Url, response: &FetchedResponse) -> Snapshot {
    Snapshot {
        key: compute_request_key("GET", requested.as_str()),
        method: "GET".to_string(),
        url: requested.to_string(),
        status: response.status,
        content_type: response.content_type.clone(),
        headers: retain_headers(&response.headers),
        body: response.bytes.clone(),
        fetched_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Single-instance, event-driven cache manager.
pub struct Manager {
    store: GenerationStore,
    fetcher: Arc<dyn Fetcher>,
    manifest: Manifest,
    version: String,
    state: Mutex<LifecycleState>,
    current: RwLock<Option<String>>,
}

impl Manager {
    pub fn new(store: GenerationStore, fetcher: Arc<dyn Fetcher>, manifest: Manifest, version: String) -> Self {
        Self {
            store,
            fetcher,
            manifest,
            version,
            state: Mutex::new(LifecycleState::Uninstalled),
            current: RwLock::new(None),
        }
    }

    /// The configured version string, i.e. the name of the generation this
    /// deployment wants current.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Snapshot of the lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        self.state.lock().await.clone()
    }

    /// Name of the generation fetches are served from, once promoted.
    pub async fn current_generation(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Drive the startup lifecycle: install (or skip, if this version is
    /// already precached) and activate.
    ///
    /// A dead install falls back to the newest previously-ready generation;
    /// with nothing to fall back to, startup fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::GenerationMissing` when the install failed and no
    /// ready generation exists, or any store error.
    pub async fn startup(&self) -> Result<(), Error> {
        let version = self.version.clone();

        if self.store.is_ready(&version).await? {
            info!(version, "generation already precached; skipping install");
            self.dispatch(Event::InstallSkipped { version }).await?;
        } else {
            self.dispatch(Event::InstallRequested { version }).await?;
        }

        if matches!(self.state().await, LifecycleState::Failed { .. }) {
            match self.store.newest_ready().await? {
                Some(previous) => {
                    warn!(version = self.version, fallback = previous, "serving previous generation after failed install");
                    self.dispatch(Event::FallbackRequested { generation: previous }).await?;
                }
                None => {
                    return Err(Error::GenerationMissing(
                        "install failed and no previously-ready generation exists".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Feed one event into the state machine and run all resulting effects,
    /// including the follow-up events they produce.
    pub async fn dispatch(&self, event: Event) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let (next, effects) = transition(&state, event)?;
            info!(from = state.as_str(), to = next.as_str(), "lifecycle transition");
            *state = next;

            for effect in effects {
                if let Some(follow_up) = self.apply(effect).await? {
                    queue.push_back(follow_up);
                }
            }
        }

        Ok(())
    }

    async fn apply(&self, effect: Effect) -> Result<Option<Event>, Error> {
        match effect {
            Effect::OpenGeneration { name } => {
                self.store.open_generation(&name).await?;
                Ok(None)
            }

            Effect::PrecacheManifest { generation } => match self.precache(&generation).await {
                Ok(()) => Ok(Some(Event::InstallSucceeded)),
                Err(e) => Ok(Some(Event::InstallFailed { reason: e.to_string() })),
            },

            Effect::MarkReady { generation } => {
                self.store.mark_ready(&generation).await?;
                Ok(None)
            }

            Effect::BeginActivation => {
                let existing = self
                    .store
                    .list_generations()
                    .await?
                    .into_iter()
                    .map(|g| g.name)
                    .collect();
                Ok(Some(Event::ActivateRequested { existing }))
            }

            // Best-effort and independent per name: one failed purge must not
            // block the others or the transition to active.
            Effect::DeleteGeneration { name } => {
                match self.store.delete_generation(&name).await {
                    Ok(()) => info!(generation = name, "purged stale generation"),
                    Err(e) => warn!(generation = name, error = %e, "failed to purge stale generation"),
                }
                Ok(None)
            }

            Effect::PromoteGeneration { name } => {
                *self.current.write().await = Some(name.clone());
                info!(generation = name, "generation promoted; serving fetches from it");
                Ok(Some(Event::ActivateCompleted))
            }

            Effect::ReportInstallFailure { generation, reason } => {
                error!(generation, reason, "install failed; generation never became ready");
                Ok(None)
            }
        }
    }

    /// Fetch every manifest target concurrently (fail-fast) and store the
    /// results in one transaction.
    ///
    /// All-or-nothing: a single failing target aborts before anything is
    /// written, so a broken install leaves zero entries behind.
    async fn precache(&self, generation: &str) -> Result<(), Error> {
        let fetches = self.manifest.targets().iter().map(|target| self.fetch_target(target));
        let snapshots = try_join_all(fetches).await?;
        let count = snapshots.len();

        self.store.install_entries(generation, snapshots).await?;
        info!(generation, entries = count, "manifest precached");

        Ok(())
    }

    async fn fetch_target(&self, target: &Url) -> Result<Snapshot, Error> {
        let response = self.fetcher.fetch(target).await?;

        if !(200..300).contains(&response.status) {
            return Err(Error::InstallFailed(format!(
                "manifest target {} answered status {}",
                target, response.status
            )));
        }

        debug!(target = %target, bytes = response.bytes.len(), "manifest target fetched");
        Ok(snapshot_from_response(target, &response))
    }
}
