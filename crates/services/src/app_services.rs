use std::sync::Arc;

use leksika_storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::import_service::ImportService;
use crate::library_service::LibraryService;
use crate::sessions::{HistoryService, SessionLoopService};

/// Assembles host-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    session_loop: Arc<SessionLoopService>,
    history: Arc<HistoryService>,
    import: Arc<ImportService>,
    library: Arc<LibraryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over volatile in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            session_loop: Arc::new(SessionLoopService::new(
                clock,
                Arc::clone(&storage.words),
                Arc::clone(&storage.history),
            )),
            history: Arc::new(HistoryService::new(clock, Arc::clone(&storage.history))),
            import: Arc::new(ImportService::new(Arc::clone(&storage.words))),
            library: Arc::new(LibraryService::new(Arc::clone(&storage.words))),
        }
    }

    #[must_use]
    pub fn session_loop(&self) -> Arc<SessionLoopService> {
        Arc::clone(&self.session_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn import(&self) -> Arc<ImportService> {
        Arc::clone(&self.import)
    }

    #[must_use]
    pub fn library(&self) -> Arc<LibraryService> {
        Arc::clone(&self.library)
    }
}
