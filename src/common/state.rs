// Application state shared across all modules

use std::sync::Arc;

use crate::address::session::SessionStore;
use crate::services::directory::DirectoryApi;
use crate::services::submission::SubmissionService;

/// Application state containing the external service clients and the
/// in-memory form session store
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn DirectoryApi>,
    pub submission: Arc<SubmissionService>,
    pub sessions: SessionStore,
}
