//! Transient notifications.
//!
//! Every timed toast owns an abortable tokio task that removes it when its
//! duration runs out. Dismissing a toast early aborts that task, so no timer
//! outlives the toast it belongs to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(4000);
pub const SHORT_DURATION: Duration = Duration::from_millis(2000);

pub type ToastId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    /// Errors and warnings jump the display queue.
    pub fn is_urgent(self) -> bool {
        matches!(self, ToastKind::Error | ToastKind::Warning)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    /// Zero means the toast stays until dismissed.
    pub duration: Duration,
}

#[derive(Default)]
struct Queue {
    toasts: Vec<Toast>,
    timers: HashMap<ToastId, AbortHandle>,
}

/// Cloneable handle to the shared toast queue.
#[derive(Clone)]
pub struct ToastNotifier {
    queue: Arc<Mutex<Queue>>,
    runtime: Handle,
}

impl ToastNotifier {
    /// Timers are spawned on `runtime`, so pushing works from threads that
    /// are not themselves inside the runtime (the GTK main loop).
    pub fn new(runtime: Handle) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            runtime,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, kind: ToastKind, message: impl Into<String>, duration: Duration) -> ToastId {
        let message = message.into();
        log::debug!("toast {kind:?}: {message}");
        let mut queue = self.lock();
        let id = next_id(&queue.toasts);
        queue.toasts.push(Toast { id, kind, message, duration });

        if !duration.is_zero() {
            let shared = Arc::clone(&self.queue);
            let task = self.runtime.spawn(async move {
                tokio::time::sleep(duration).await;
                let mut queue = shared.lock().unwrap_or_else(PoisonError::into_inner);
                queue.timers.remove(&id);
                queue.toasts.retain(|t| t.id != id);
            });
            queue.timers.insert(id, task.abort_handle());
        }
        id
    }

    pub fn success(&self, message: impl Into<String>, duration: Duration) -> ToastId {
        self.push(ToastKind::Success, message, duration)
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.push(ToastKind::Error, message, DEFAULT_DURATION)
    }

    /// Removes the toast now, cancelling its timer if one is pending.
    pub fn remove(&self, id: ToastId) {
        let mut queue = self.lock();
        if let Some(timer) = queue.timers.remove(&id) {
            timer.abort();
        }
        queue.toasts.retain(|t| t.id != id);
    }

    /// Active toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

/// Millisecond timestamp scaled up with a random low part, re-rolled on
/// the rare clash with a toast that is still showing.
fn next_id(active: &[Toast]) -> ToastId {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or_default();
    let base = millis.saturating_mul(1000);
    loop {
        let id = base.saturating_add(rand::random::<u64>() % 1000);
        if !active.iter().any(|t| t.id == id) {
            return id;
        }
    }
}
