use std::sync::Arc;

use parking_lot::Mutex;

use crate::{engine::Engine, persistence::ProjectSnapshot};

/// Single-writer handle for hosts that touch one editing session from
/// several threads. Each closure runs to completion under the lock, so
/// readers never observe a half-applied edit.
#[derive(Debug, Clone, Default)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn mutate<R>(&self, edit: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.inner.lock();
        edit(&mut engine)
    }

    pub fn read<R>(&self, view: impl FnOnce(&Engine) -> R) -> R {
        let engine = self.inner.lock();
        view(&engine)
    }

    #[must_use]
    pub fn snapshot(&self) -> ProjectSnapshot {
        self.inner.lock().snapshot()
    }
}
