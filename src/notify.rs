use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastIcon {
    Success,
    None,
}

/// A transient user-facing notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub icon: ToastIcon,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: ToastIcon::Success,
        }
    }

    pub fn plain(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: ToastIcon::None,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn toast(&self, toast: Toast);
}

/// Reports toasts through `tracing`; what the CLI uses.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn toast(&self, toast: Toast) {
        match toast.icon {
            ToastIcon::Success => tracing::info!(title = %toast.title, "toast"),
            ToastIcon::None => tracing::warn!(title = %toast.title, "toast"),
        }
    }
}

/// Keeps every toast; clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    toasts: Arc<Mutex<Vec<Toast>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().ok().and_then(|t| t.last().cloned())
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, toast: Toast) {
        if let Ok(mut t) = self.toasts.lock() {
            t.push(toast);
        }
    }
}
