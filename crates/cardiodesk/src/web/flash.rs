//! One-shot status messages.
//!
//! A handler that mutates data queues a message and redirects; the next page
//! rendered drains the queue and shows it.

use std::sync::{Mutex, PoisonError};

/// Severity of a flash message, mapped to a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    /// Operation completed.
    Success,
    /// Operation failed.
    Danger,
    /// Additional information.
    Info,
}

impl FlashLevel {
    /// CSS class suffix.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
            Self::Info => "info",
        }
    }
}

/// A queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    /// Severity.
    pub level: FlashLevel,
    /// Text shown to the user.
    pub message: String,
}

impl Flash {
    /// A success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    /// An error message.
    #[must_use]
    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Danger,
            message: message.into(),
        }
    }

    /// An informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }
}

/// Messages waiting for the next rendered page.
#[derive(Debug, Default)]
pub struct FlashQueue {
    messages: Mutex<Vec<Flash>>,
}

impl FlashQueue {
    /// Queue a message.
    pub fn push(&self, flash: Flash) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(flash);
    }

    /// Remove and return every queued message, oldest first.
    pub fn drain(&self) -> Vec<Flash> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_strings() {
        assert_eq!(FlashLevel::Success.as_str(), "success");
        assert_eq!(FlashLevel::Danger.as_str(), "danger");
        assert_eq!(FlashLevel::Info.as_str(), "info");
    }

    #[test]
    fn test_drain_empties_queue_in_order() {
        let queue = FlashQueue::default();
        queue.push(Flash::success("saved"));
        queue.push(Flash::danger("analysis failed"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "saved");
        assert_eq!(drained[1].level, FlashLevel::Danger);
        assert!(queue.drain().is_empty());
    }
}
