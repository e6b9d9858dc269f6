//! Security event delivery over a broadcast channel, plus an audit logger
//! subscriber.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::shield::{Notifier, SecurityEvent};

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<SecurityEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn emit(&self, event: SecurityEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            tracing::warn!(event = event.name(), "security event dropped: no subscribers");
        }
    }
}

/// Log every event received on `rx` until the channel closes.
pub fn spawn_audit_log(mut rx: broadcast::Receiver<SecurityEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let user = event.principal().map(|p| p.username.as_str());
                    match &event {
                        SecurityEvent::Logout { at, .. } => {
                            tracing::info!(
                                target: "audit",
                                event = event.name(),
                                user = user.unwrap_or("-"),
                                at = %at.to_rfc3339(),
                                "security event"
                            );
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "audit", skipped, "audit log fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
