//! Run control: cancellation, progress reporting and the per-project gate.
//!
//! A detection run executes on whatever thread the caller chooses. The caller
//! keeps a clone of the [`CancelToken`] to stop it and may attach a progress
//! callback, which is invoked on the worker's thread.

use crate::util::{ChipMatchError, ChipMatchResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared cooperative cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the run stops before its next evaluation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Progress snapshot: evaluated anchors (or scan lines) out of an estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub completed: u64,
    pub total: u64,
}

impl Progress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f32 / self.total as f32).min(1.0)
    }
}

type ProgressFn = dyn Fn(Progress) + Send + Sync;

/// Allows at most one detection run per project at a time.
#[derive(Clone, Debug, Default)]
pub struct RunGate {
    active: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate or fails with `RunInProgress`.
    pub fn try_begin(&self) -> ChipMatchResult<RunPermit> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChipMatchError::RunInProgress)?;
        Ok(RunPermit {
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Admits a run with `ctx`.
    ///
    /// A context holding this gate's permit passes as is. Any other context
    /// claims the gate for the duration of the returned permit.
    pub(crate) fn admit(&self, ctx: &RunContext) -> ChipMatchResult<Option<RunPermit>> {
        if ctx.holds_permit_of(self) {
            return Ok(None);
        }
        self.try_begin().map(Some)
    }
}

/// Proof of an active run; releases the gate when dropped.
#[derive(Debug)]
pub struct RunPermit {
    active: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Everything a detector needs to cooperate with its caller.
#[derive(Default)]
pub struct RunContext {
    cancel: CancelToken,
    progress: Option<Arc<ProgressFn>>,
    permit: Option<RunPermit>,
}

impl RunContext {
    /// Context without a project gate, for standalone use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context holding `permit` for the lifetime of the run.
    pub fn with_permit(permit: RunPermit) -> Self {
        Self {
            permit: Some(permit),
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Token that cancels this run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn holds_permit_of(&self, gate: &RunGate) -> bool {
        self.permit
            .as_ref()
            .is_some_and(|permit| Arc::ptr_eq(&permit.active, &gate.active))
    }

    pub(crate) fn tracker(&self, total: u64) -> ProgressTracker<'_> {
        ProgressTracker {
            sink: self.progress.as_deref(),
            total,
            completed: AtomicU64::new(0),
            reported: Mutex::new(0),
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .field("gated", &self.permit.is_some())
            .finish()
    }
}

/// Counts completed work and forwards strictly increasing progress.
pub(crate) struct ProgressTracker<'a> {
    sink: Option<&'a ProgressFn>,
    total: u64,
    completed: AtomicU64,
    reported: Mutex<u64>,
}

impl ProgressTracker<'_> {
    /// Records `n` finished units and notifies the callback.
    pub(crate) fn advance(&self, n: u64) {
        let completed = self.completed.fetch_add(n, Ordering::AcqRel) + n;
        let Some(sink) = self.sink else {
            return;
        };
        // Serialize callbacks so observers never see the count go backwards.
        if let Ok(mut reported) = self.reported.lock() {
            if completed > *reported {
                *reported = completed;
                sink(Progress {
                    completed,
                    total: self.total.max(completed),
                });
            }
        }
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }
}

/// Outcome of a detection run.
///
/// A cancelled run is not an error: `items` then holds what was already
/// accepted before the cancellation point.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection<T> {
    pub items: Vec<T>,
    pub cancelled: bool,
}

impl<T> Detection<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
