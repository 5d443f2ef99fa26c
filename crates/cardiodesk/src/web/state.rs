//! Shared application state for the web handlers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::analysis::Analyzer;
use crate::error::Result;
use crate::storage::Storage;

use super::flash::{Flash, FlashQueue};

/// Shared application state.
///
/// Cheap to clone; every handler receives its own handle to the same inner
/// state.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    storage: Mutex<Storage>,
    analyzer: Analyzer,
    flashes: FlashQueue,
}

impl AppState {
    /// Create the state from an opened store and an analyzer.
    #[must_use]
    pub fn new(storage: Storage, analyzer: Analyzer) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                storage: Mutex::new(storage),
                analyzer,
                flashes: FlashQueue::default(),
            }),
        }
    }

    /// Run `f` with exclusive access to the store.
    ///
    /// The lock is released before returning, so the result can be held
    /// across `.await` points.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn with_storage<T>(&self, f: impl FnOnce(&Storage) -> Result<T>) -> Result<T> {
        let storage = self
            .inner
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&storage)
    }

    /// The analysis pipeline.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.inner.analyzer
    }

    /// Queue a message for the next rendered page.
    ///
    /// The queue is shared by every client of the process: whichever browser
    /// renders a page next receives the message. This suits a single
    /// operator on localhost only.
    pub fn flash(&self, flash: Flash) {
        self.inner.flashes.push(flash);
    }

    /// Take all queued messages.
    #[must_use]
    pub fn take_flashes(&self) -> Vec<Flash> {
        self.inner.flashes.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analysis::{Analyzer, ResultLayout};
    use crate::config::Config;

    fn state() -> AppState {
        let analyzer = Analyzer::from_config(&Config::default());
        AppState::new(Storage::open_in_memory().unwrap(), analyzer)
    }

    #[test]
    fn test_flashes_are_shared_between_clones() {
        let state = state();
        let other = state.clone();

        state.flash(Flash::success("saved"));
        assert_eq!(other.take_flashes(), vec![Flash::success("saved")]);
        assert!(state.take_flashes().is_empty());
    }

    #[test]
    fn test_with_storage_returns_result() {
        let state = state();
        assert_eq!(state.with_storage(|s| s.count()).unwrap(), 0);
        assert_eq!(
            state.analyzer().layout(),
            &ResultLayout::from_config(&Config::default())
        );
    }
}
