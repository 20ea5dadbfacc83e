//! Deadlines and cancellation for a single execution.
//!
//! A [`Context`] is checked by the execution engine before every result is
//! pulled from the query. Cancellation flows downward: cancelling a context
//! stops every execution running under it or under a context derived from it,
//! while cancelling a derived context leaves its parent and siblings running.
//! Clones share the cancellation state of the original.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a context stopped an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The deadline passed.
    DeadlineExceeded,
    /// [`Context::cancel`] was called.
    Cancelled,
}

/// Deadline and cancellation state handed to
/// [`Pipeline::execute`](crate::Pipeline::execute).
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Arc<CancelNode>,
}

/// One link in a chain of cancellation flags, child to root.
#[derive(Debug, Default)]
struct CancelNode {
    cancelled: AtomicBool,
    parent: Option<Arc<CancelNode>>,
}

impl CancelNode {
    fn child(parent: &Arc<CancelNode>) -> Arc<CancelNode> {
        Arc::new(CancelNode {
            cancelled: AtomicBool::new(false),
            parent: Some(Arc::clone(parent)),
        })
    }

    fn is_cancelled(&self) -> bool {
        let mut node = Some(self);
        while let Some(current) = node {
            if current.cancelled.load(Ordering::Acquire) {
                return true;
            }
            node = current.parent.as_deref();
        }
        false
    }
}

impl Context {
    /// A context with no deadline that is never cancelled unless asked to.
    pub fn background() -> Self {
        Context::default()
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => Context {
                deadline: self.deadline,
                cancel: CancelNode::child(&self.cancel),
            },
        }
    }

    /// Derive a context whose deadline is at most `deadline`. An earlier
    /// deadline on `self` is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Context {
            deadline: Some(deadline),
            cancel: CancelNode::child(&self.cancel),
        }
    }

    /// Cancel this context, its clones and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancelled.store(true, Ordering::Release);
    }

    /// Whether this context or one of its ancestors was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns an interrupt if the context was cancelled or its deadline passed.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupt::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
