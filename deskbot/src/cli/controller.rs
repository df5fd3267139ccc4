//! The single controller instance that owns the view model.
//!
//! It glues pure view transitions to the remote store and the local state
//! file. Remote calls can run inline (`send_message`, `switch_session`, ...)
//! or as spawned tasks whose results come back as [`Completion`]s, so the
//! interactive loop can keep several calls in flight.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, ApiResult, ClearScope, DeleteResponse, SessionMessages};
use crate::config::Config;
use crate::models::{short_id, Session, SessionSummary};
use crate::session::resolve_active_session;
use crate::store::LocalStore;
use crate::view::{Applied, BeginSend, NewSession, PendingLoad, PendingSend, SessionView};

/// Result of a spawned remote call.
#[derive(Debug)]
pub enum Completion {
    Send(PendingSend, ApiResult<String>),
    Load(PendingLoad, ApiResult<SessionMessages>),
    Sessions(ApiResult<Vec<Session>>),
    /// A session list requested for display, with the filter to show it with.
    Listing(String, ApiResult<Vec<Session>>),
    Probe(bool),
    /// A probe asked for by the user; its result is reported.
    Status(bool),
    /// A probe run because a send was refused while degraded.
    Resend(String, bool),
    Delete(Vec<String>, ApiResult<DeleteResponse>),
    Clear(ApiResult<DeleteResponse>),
    Summary(String, ApiResult<SessionSummary>),
}

pub struct Controller {
    api: ApiClient,
    store: LocalStore,
    view: SessionView,
}

impl Controller {
    /// Build the controller, resolving the active session (an explicit id
    /// wins over the stored one).
    pub fn new(config: &Config, explicit_session: Option<&str>) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.server, config.request_timeout)?;
        let store = LocalStore::open(config.state_file()?);
        Ok(Self::with_parts(api, store, explicit_session))
    }

    pub fn with_parts(
        api: ApiClient,
        mut store: LocalStore,
        explicit_session: Option<&str>,
    ) -> Self {
        let session_id = resolve_active_session(&mut store, explicit_session);
        debug!(session_id = %session_id, "active session resolved");
        Self {
            api,
            store,
            view: SessionView::new(session_id),
        }
    }

    pub const fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut SessionView {
        &mut self.view
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    fn persist_active(&mut self) {
        if let Err(e) = self.store.set_active_session_id(self.view.session_id()) {
            warn!(error = %e, "failed to persist active session id");
        }
    }

    // === Liveness ===

    /// Probe the server and record the result.
    pub async fn probe(&mut self) -> bool {
        let reachable = probe(&self.api).await;
        self.view.set_connected(reachable);
        reachable
    }

    // === Sending ===

    /// Start a send. While degraded, the server is re-probed once before the
    /// send is refused.
    async fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let mut begun = self.view.begin_send(text);
        if begun == BeginSend::Offline && self.probe().await {
            begun = self.view.begin_send(text);
        }

        match begun {
            BeginSend::Started(pending) => Some(pending),
            BeginSend::Ignored => None,
            BeginSend::Offline => {
                self.refuse_offline_send();
                None
            }
        }
    }

    fn refuse_offline_send(&mut self) {
        self.view
            .notify("Not connected to the server; message not sent. Try /status.");
    }

    /// Send `text` and wait for the reply.
    pub async fn send_message(&mut self, text: &str) -> Option<Applied> {
        let pending = self.begin_send(text).await?;
        let outcome = self.api.chat(&pending.message, &pending.session_id).await;
        Some(self.view.complete_send(&pending, outcome))
    }

    /// Start a send whose reply arrives later on `tx`. While degraded, a probe
    /// is spawned instead and the send is retried when it reports back.
    pub fn spawn_send(&mut self, text: &str, tx: &mpsc::UnboundedSender<Completion>) -> bool {
        let pending = match self.view.begin_send(text) {
            BeginSend::Started(pending) => pending,
            BeginSend::Ignored => return false,
            BeginSend::Offline => {
                let text = text.to_string();
                let api = self.api.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let reachable = probe(&api).await;
                    let _ = tx.send(Completion::Resend(text, reachable));
                });
                return false;
            }
        };
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.chat(&pending.message, &pending.session_id).await;
            let _ = tx.send(Completion::Send(pending, outcome));
        });
        true
    }

    // === Switching ===

    fn begin_switch(&mut self, session_id: &str) -> PendingLoad {
        let pending = self.view.begin_switch(session_id);
        self.persist_active();
        pending
    }

    /// Make `session_id` active and load its history.
    pub async fn switch_session(&mut self, session_id: &str) -> Applied {
        let pending = self.begin_switch(session_id);
        let outcome = self.api.session_messages(&pending.session_id).await;
        self.view.complete_load(&pending, outcome)
    }

    /// Reload the active session's history.
    pub async fn reload(&mut self) -> Applied {
        let id = self.view.session_id().to_string();
        self.switch_session(&id).await
    }

    /// Start a switch whose history arrives later on `tx`.
    pub fn spawn_switch(&mut self, session_id: &str, tx: &mpsc::UnboundedSender<Completion>) {
        let pending = self.begin_switch(session_id);
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.session_messages(&pending.session_id).await;
            let _ = tx.send(Completion::Load(pending, outcome));
        });
    }

    // === New / delete ===

    pub fn start_new_session(&mut self, confirmed: bool) -> NewSession {
        let result = self.view.start_new_session(confirmed);
        if result == NewSession::Started {
            self.persist_active();
        }
        result
    }

    /// Delete one session, moving to a new session if it was the active one.
    pub async fn delete_session(&mut self, session_id: &str) -> Applied {
        let outcome = self.api.delete_session(session_id).await;
        let applied = self.view.complete_delete(&[session_id.to_string()], outcome);
        self.persist_active();
        self.list_sessions().await;
        applied
    }

    /// Start a delete whose outcome arrives later on `tx`.
    pub fn spawn_delete(&self, session_id: &str, tx: &mpsc::UnboundedSender<Completion>) {
        let id = session_id.to_string();
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.delete_session(&id).await;
            let _ = tx.send(Completion::Delete(vec![id], outcome));
        });
    }

    /// Delete several sessions at once. Requires the confirmation phrase.
    pub async fn delete_sessions(
        &mut self,
        session_ids: &[String],
        confirmation: &str,
    ) -> Applied {
        let outcome = self.api.delete_sessions(session_ids, confirmation).await;
        if matches!(outcome, Err(ApiError::Confirmation)) {
            return self.view.complete_clear(outcome);
        }
        let applied = self.view.complete_delete(session_ids, outcome);
        self.persist_active();
        self.list_sessions().await;
        applied
    }

    /// Bulk-clear sessions on the server. Requires the confirmation phrase.
    pub async fn clear_sessions(&mut self, scope: ClearScope, confirmation: &str) -> Applied {
        let outcome = self.api.clear_sessions(scope, confirmation).await;
        let applied = self.view.complete_clear(outcome);
        if applied == Applied::Success {
            self.list_sessions().await;
        }
        applied
    }

    /// Start a bulk clear whose outcome arrives later on `tx`.
    pub fn spawn_clear(
        &self,
        scope: ClearScope,
        confirmation: &str,
        tx: &mpsc::UnboundedSender<Completion>,
    ) {
        let confirmation = confirmation.to_string();
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.clear_sessions(scope, &confirmation).await;
            let _ = tx.send(Completion::Clear(outcome));
        });
    }

    // === Listing ===

    /// Fetch the session list, falling back to the cached copy when the
    /// server cannot be reached or answers with an error.
    pub async fn list_sessions(&mut self) -> &[Session] {
        let outcome = self.api.list_sessions().await;
        self.apply_sessions(outcome);
        self.view.sessions()
    }

    pub fn spawn_list(&self, tx: &mpsc::UnboundedSender<Completion>) {
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Sessions(api.list_sessions().await));
        });
    }

    /// Fetch the session list for display with `filter`.
    pub fn spawn_listing(&self, filter: &str, tx: &mpsc::UnboundedSender<Completion>) {
        let filter = filter.to_string();
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Completion::Listing(filter, api.list_sessions().await));
        });
    }

    fn apply_sessions(&mut self, outcome: ApiResult<Vec<Session>>) {
        match outcome {
            Ok(sessions) => {
                if let Err(e) = self.store.cache_sessions(&sessions) {
                    warn!(error = %e, "failed to cache session list");
                }
                self.view.set_sessions(sessions, false);
            }
            Err(e) => {
                warn!(error = %e, "session list unavailable, using cached copy");
                let cached = self.store.cached_sessions().to_vec();
                self.view.set_sessions(cached, true);
            }
        }
    }

    pub async fn summary(&self, session_id: &str) -> ApiResult<SessionSummary> {
        self.api.session_summary(session_id).await
    }

    pub fn spawn_summary(&self, session_id: &str, tx: &mpsc::UnboundedSender<Completion>) {
        let id = session_id.to_string();
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = api.session_summary(&id).await;
            let _ = tx.send(Completion::Summary(id, outcome));
        });
    }

    // === Completions ===

    /// Probe in the background. With `report`, the result is announced.
    pub fn spawn_probe(&self, report: bool, tx: &mpsc::UnboundedSender<Completion>) {
        let api = self.api.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let reachable = probe(&api).await;
            let completion = if report {
                Completion::Status(reachable)
            } else {
                Completion::Probe(reachable)
            };
            let _ = tx.send(completion);
        });
    }

    /// Apply a completion from a spawned call, starting any follow-up calls
    /// on `tx`. Returns the applied outcome for sends, loads and deletes.
    ///
    /// Rendering a summary or a listing is left to the caller.
    pub fn apply(
        &mut self,
        completion: Completion,
        tx: &mpsc::UnboundedSender<Completion>,
    ) -> Option<Applied> {
        match completion {
            Completion::Send(pending, outcome) => {
                let applied = self.view.complete_send(&pending, outcome);
                match applied {
                    Applied::Success => self.spawn_list(tx),
                    Applied::Stale => debug!(
                        call = %pending.call,
                        session_id = %pending.session_id,
                        "discarded stale reply"
                    ),
                    Applied::Failed => {}
                }
                Some(applied)
            }
            Completion::Load(pending, outcome) => {
                let applied = self.view.complete_load(&pending, outcome);
                if applied == Applied::Stale {
                    debug!(session_id = %pending.session_id, "discarded stale history load");
                }
                Some(applied)
            }
            Completion::Sessions(outcome) | Completion::Listing(_, outcome) => {
                self.apply_sessions(outcome);
                None
            }
            Completion::Probe(reachable) => {
                self.view.set_connected(reachable);
                None
            }
            Completion::Status(reachable) => {
                self.view.set_connected(reachable);
                self.view.notify(if reachable {
                    "Connected to the server."
                } else {
                    "Server is not reachable."
                });
                None
            }
            Completion::Resend(text, reachable) => {
                self.view.set_connected(reachable);
                if !reachable || !self.spawn_send(&text, tx) {
                    self.refuse_offline_send();
                }
                None
            }
            Completion::Delete(ids, outcome) => {
                let applied = self.view.complete_delete(&ids, outcome);
                self.persist_active();
                self.spawn_list(tx);
                Some(applied)
            }
            Completion::Clear(outcome) => {
                let applied = self.view.complete_clear(outcome);
                if applied == Applied::Success {
                    self.spawn_list(tx);
                }
                Some(applied)
            }
            Completion::Summary(id, outcome) => {
                if let Err(e) = outcome {
                    self.view
                        .notify(format!("Failed to load summary for {}: {e}", short_id(&id)));
                }
                None
            }
        }
    }
}

async fn probe(api: &ApiClient) -> bool {
    match api.status().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "liveness probe failed");
            false
        }
    }
}
