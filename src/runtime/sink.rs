//! Notification sinks
//!
//! The seam between the engine and the outside world: the telephony
//! transport, the speech bridge, loggers and test recorders all register
//! here.

use crate::state_machine::Notification;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Receives every notification a session emits, in firing order.
///
/// Called synchronously from the session's own task; implementations must
/// return promptly.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Adapter for plain closures
pub struct FnSink<F>(pub F);

impl<F> NotificationSink for FnSink<F>
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        (self.0)(notification);
    }
}

/// Fan-out to subscribers; lagging or absent receivers are not an error
impl NotificationSink for broadcast::Sender<Notification> {
    fn notify(&self, notification: &Notification) {
        let _ = self.send(notification.clone());
    }
}

/// Logs each notification with the call it belongs to
pub struct LoggingSink {
    call_id: String,
}

impl LoggingSink {
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
        }
    }
}

impl NotificationSink for LoggingSink {
    fn notify(&self, notification: &Notification) {
        match notification {
            Notification::StateChanged { node, history } => tracing::info!(
                call_id = %self.call_id,
                state = %node.id,
                depth = history.len(),
                "State changed"
            ),
            Notification::TransferRequested { node } => {
                tracing::info!(call_id = %self.call_id, state = %node.id, "Transfer requested");
            }
            // Caller-entered digits stay out of the logs
            Notification::InputCollected { node, value } => tracing::info!(
                call_id = %self.call_id,
                state = %node.id,
                digits = value.len(),
                "Input collected"
            ),
            Notification::FatalError { description } => {
                tracing::error!(call_id = %self.call_id, error = %description, "Fatal session error");
            }
            other => tracing::debug!(call_id = %self.call_id, kind = other.kind(), "Notification"),
        }
    }
}

/// Registry of sinks for one session
#[derive(Clone, Default)]
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Arc<dyn NotificationSink>) -> &mut Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Register a closure
    #[must_use]
    pub fn with_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.with(Arc::new(FnSink(f)))
    }

    /// Deliver to every sink in registration order
    pub fn dispatch(&self, notification: &Notification) {
        for sink in &self.sinks {
            sink.notify(notification);
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
