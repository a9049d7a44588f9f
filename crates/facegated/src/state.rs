use crate::config::Config;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::engine::EngineHandle;
use crate::error::{ApiError, ApiResult};
use facegate_core::{EncodingStore, Identity};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The only shared mutable resource. Mutations and snapshots both go
    /// through this lock so names and encodings are always seen in step.
    store: Arc<Mutex<EncodingStore>>,
    pub engine: EngineHandle,
    pub dispatcher: Dispatcher,
    pub threshold: f32,
    pub device_addr: Option<String>,
    pub debug_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: &Config, store: EncodingStore, engine: EngineHandle) -> Result<Self, DispatchError> {
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            engine,
            dispatcher: Dispatcher::new(config.dispatch_timeout)?,
            threshold: config.match_threshold,
            device_addr: config.device_addr.clone(),
            debug_dir: config.debug_dir.clone(),
        })
    }

    /// Consistent copy of the enrolled identities; the lock is released
    /// before matching starts.
    pub fn snapshot(&self) -> ApiResult<Vec<Identity>> {
        Ok(self.lock_store()?.identities())
    }

    pub fn known_names(&self) -> ApiResult<Vec<String>> {
        Ok(self.lock_store()?.names().to_vec())
    }

    /// Run a store mutation on the blocking pool under the store lock.
    pub async fn mutate_store<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&mut EncodingStore) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| ApiError::Internal("encoding store lock poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
    }

    fn lock_store(&self) -> ApiResult<MutexGuard<'_, EncodingStore>> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("encoding store lock poisoned".into()))
    }
}
