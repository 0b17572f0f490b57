//! Shared server state, injected into handlers by axum's `State` extractor.

use std::sync::Arc;

use chirp_core::SessionController;

use crate::settings::ServerSettings;

#[derive(Clone)]
pub struct AppState {
    /// The session controller. One per process; owns the active session.
    pub controller: Arc<SessionController>,
    /// Settings snapshot taken at startup.
    pub settings: Arc<ServerSettings>,
}
