//! Cancellation contexts with deadlines.
//!
//! Every externally-facing operation accepts a [`CancelContext`]; child
//! operations inherit the parent's flag and the earlier of the two
//! deadlines. Suspension points (embedding calls, vector queries, channel
//! receives) check the context and bail with `Cancelled` or `Timeout`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// A cancellation signal with an optional deadline.
#[derive(Debug, Clone)]
pub struct CancelContext {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelContext {
    /// A context that never cancels on its own.
    #[must_use]
    pub fn none() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A context that fires after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a child context: shares the parent's flag and keeps the
    /// earlier of the parent deadline and `timeout` from now.
    #[must_use]
    pub fn child(&self, timeout: Duration) -> Self {
        let child_deadline = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) => Some(parent.min(child_deadline)),
            None => Some(child_deadline),
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline,
        }
    }

    /// Signal cancellation to every holder of this context and its children.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the flag was raised (deadline not considered).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left until the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Bail out if cancelled or past the deadline.
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.deadline_exceeded() {
            return Err(Error::Timeout(operation.to_string()));
        }
        Ok(())
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_propagates_to_children() {
        let parent = CancelContext::none();
        let child = parent.child(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_cancelled());
        assert!(child.check("op").is_err());
    }

    #[test]
    fn child_inherits_earlier_deadline() {
        let parent = CancelContext::with_timeout(Duration::from_millis(1));
        let child = parent.child(Duration::from_secs(3600));
        std::thread::sleep(Duration::from_millis(5));
        assert!(child.deadline_exceeded());
        assert!(matches!(child.check("op"), Err(Error::Timeout(_))));
    }

    #[test]
    fn unset_context_never_fires() {
        let context = CancelContext::none();
        assert!(!context.deadline_exceeded());
        assert!(context.check("op").is_ok());
        assert!(context.remaining().is_none());
    }
}
