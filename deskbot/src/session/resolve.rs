//! Active session resolution.

use tracing::{debug, warn};

use super::id::generate_session_id;
use crate::store::LocalStore;

/// Resolve which session is active.
///
/// Priority order:
/// 1. An explicitly supplied id (the `--session` flag), which is persisted
/// 2. The id persisted by a previous run
/// 3. A freshly generated id, which is persisted
pub fn resolve_active_session(store: &mut LocalStore, explicit: Option<&str>) -> String {
    let explicit = explicit.map(str::trim).filter(|id| !id.is_empty());

    let session_id = if let Some(id) = explicit {
        debug!(session_id = id, "adopting explicit session id");
        id.to_string()
    } else if let Some(id) = store.active_session_id().filter(|id| !id.is_empty()) {
        return id.to_string();
    } else {
        let id = generate_session_id();
        debug!(session_id = %id, "generated new session id");
        id
    };

    if let Err(e) = store.set_active_session_id(&session_id) {
        warn!(error = %e, "failed to persist active session id");
    }
    session_id
}
