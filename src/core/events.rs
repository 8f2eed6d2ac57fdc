// ─── Event bus ───
// Multi-consumer broadcast of monitor transitions. The desktop shell holds one
// subscription and forwards each event to the webview under `name()`.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::core::monitor::Credentials;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MonitorEvent {
    CredentialsUpdated(Credentials),
    MonitoringError { message: String },
}

impl MonitorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::CredentialsUpdated(_) => "credentials-updated",
            MonitorEvent::MonitoringError { .. } => "monitoring-error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Deliver to every live subscription. Having none is fine.
    pub fn publish(&self, event: MonitorEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => debug!("Published {} to {} subscriber(s)", name, receivers),
            Err(_) => debug!("Published {} with no subscribers", name),
        }
    }
}

#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<MonitorEvent>,
}

impl EventSubscription {
    /// Next event in publish order. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, {} event(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<MonitorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(MonitorEvent::MonitoringError {
            message: "one".into(),
        });
        bus.publish(MonitorEvent::MonitoringError {
            message: "two".into(),
        });

        for sub in [&mut a, &mut b] {
            let first = sub.recv().await.unwrap();
            let second = sub.recv().await.unwrap();
            assert_eq!(
                first,
                MonitorEvent::MonitoringError {
                    message: "one".into()
                }
            );
            assert_eq!(
                second,
                MonitorEvent::MonitoringError {
                    message: "two".into()
                }
            );
        }
    }

    #[test]
    fn unsubscribe_detaches() {
        let bus = EventBus::new();
        let gone = bus.subscribe();
        let mut kept = bus.subscribe();
        gone.unsubscribe();
        bus.publish(MonitorEvent::MonitoringError {
            message: "after".into(),
        });
        assert_eq!(
            kept.try_recv(),
            Some(MonitorEvent::MonitoringError {
                message: "after".into()
            })
        );

        kept.unsubscribe();
        bus.publish(MonitorEvent::MonitoringError {
            message: "nobody listens".into(),
        });
    }

    #[test]
    fn error_payload_shape() {
        let event = MonitorEvent::MonitoringError {
            message: "boom".into(),
        };
        assert_eq!(event.name(), "monitoring-error");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"message": "boom"})
        );
    }
}
