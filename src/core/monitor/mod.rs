// ─── Credential monitor ───
// Single-session state machine that watches for a locally launched game
// client and captures its session credentials.
//
//   Idle → Monitoring → { Completed | Failed | Cancelled }
//
// All transitions happen under one lock; the supervision task re-checks the
// session id before applying its outcome, so a cancelled or superseded
// session can never emit.

pub mod credentials;
pub mod session;
pub mod source;

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::config::MonitorConfig;
use crate::core::error::{AppError, AppResult};
use crate::core::events::{EventBus, MonitorEvent};
use crate::core::settings::SettingsStore;

pub use credentials::{delete_credentials, Credentials};
pub use session::{MonitorSession, MonitorState};
pub use source::{CredentialSource, ProcessCredentialSource};

#[derive(Default)]
struct Inner {
    session: MonitorSession,
    cancel: Option<watch::Sender<bool>>,
}

enum Outcome {
    Completed(Credentials),
    Failed(String),
}

#[derive(Clone)]
pub struct CredentialMonitor {
    inner: Arc<Mutex<Inner>>,
    source: Arc<dyn CredentialSource>,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    config: MonitorConfig,
}

impl CredentialMonitor {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        settings: Arc<dyn SettingsStore>,
        events: EventBus,
        config: MonitorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            source,
            settings,
            events,
            config,
        }
    }

    /// Begin a session. Outcomes arrive later on the event bus; the only
    /// error returned here is `AlreadyMonitoring`.
    pub async fn start(&self) -> AppResult<MonitorSession> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_monitoring() {
            return Err(AppError::AlreadyMonitoring);
        }

        let session = MonitorSession::begin(self.config.deadline());
        let id = session.id.unwrap_or_else(Uuid::new_v4);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        inner.session = session.clone();
        inner.cancel = Some(cancel_tx);
        drop(inner);

        info!(
            "Credential monitoring started (session {}, deadline {}s)",
            id,
            self.config.deadline().as_secs()
        );

        let monitor = self.clone();
        tokio::spawn(async move { monitor.supervise(id, cancel_rx).await });

        Ok(session)
    }

    /// Stop the running session. No-op when nothing is running.
    pub async fn cancel(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.session.is_monitoring() {
            debug!("Cancel requested with no active session");
            return;
        }

        inner.session.state = MonitorState::Cancelled;
        if let Some(cancel) = inner.cancel.take() {
            let _ = cancel.send(true);
        }
        info!("Credential monitoring cancelled");
    }

    pub async fn stop(&self) {
        self.cancel().await
    }

    pub async fn is_monitoring(&self) -> bool {
        self.inner.lock().await.session.is_monitoring()
    }

    pub async fn session(&self) -> MonitorSession {
        self.inner.lock().await.session.clone()
    }

    async fn supervise(&self, id: Uuid, mut cancel: watch::Receiver<bool>) {
        let deadline = Instant::now() + self.config.deadline();
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => {
                    debug!("Supervision of session {} stopped", id);
                    return;
                }
                _ = ticker.tick() => {}
            }

            if Instant::now() >= deadline {
                let timeout = AppError::MonitoringTimeout(self.config.deadline());
                self.finish(id, Outcome::Failed(timeout.to_string())).await;
                return;
            }

            match self.source.poll().await {
                Ok(Some(credentials)) => {
                    self.finish(id, Outcome::Completed(credentials)).await;
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Credential source failed: {}", e);
                    self.finish(id, Outcome::Failed(e.to_string())).await;
                    return;
                }
            }
        }
    }

    async fn finish(&self, id: Uuid, outcome: Outcome) {
        let mut inner = self.inner.lock().await;
        if inner.session.id != Some(id) || !inner.session.is_monitoring() {
            debug!("Discarding outcome of inactive session {}", id);
            return;
        }
        inner.cancel = None;

        match outcome {
            Outcome::Completed(credentials) => {
                if let Err(e) = credentials.persist(self.settings.as_ref()) {
                    warn!("Could not persist detected credentials: {}", e);
                    inner.session.state = MonitorState::Failed;
                    self.events.publish(MonitorEvent::MonitoringError {
                        message: e.to_string(),
                    });
                    return;
                }
                inner.session.state = MonitorState::Completed;
                info!("Credentials captured for {}", credentials.username);
                self.events
                    .publish(MonitorEvent::CredentialsUpdated(credentials));
            }
            Outcome::Failed(message) => {
                inner.session.state = MonitorState::Failed;
                warn!("Credential monitoring failed: {}", message);
                self.events
                    .publish(MonitorEvent::MonitoringError { message });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::core::events::EventSubscription;
    use crate::core::settings::MemorySettingsStore;

    /// Replays canned poll results, then reports "not yet" forever.
    #[derive(Default)]
    struct ScriptedSource {
        script: std::sync::Mutex<VecDeque<AppResult<Option<Credentials>>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<AppResult<Option<Credentials>>>) -> Arc<Self> {
            Arc::new(Self {
                script: std::sync::Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl CredentialSource for ScriptedSource {
        async fn poll(&self) -> AppResult<Option<Credentials>> {
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            uuid: "uuid-1".into(),
            access_token: "token".into(),
            username: "Steve".into(),
            game_dir: "/games/mc".into(),
            client_id: "client".into(),
            xuid: "xuid".into(),
            user_type: "msa".into(),
        }
    }

    fn monitor_with(
        source: Arc<dyn CredentialSource>,
        deadline_secs: u64,
    ) -> (CredentialMonitor, Arc<MemorySettingsStore>, EventSubscription) {
        let settings = Arc::new(MemorySettingsStore::new());
        let events = EventBus::new();
        let subscription = events.subscribe();
        let config = MonitorConfig {
            poll_interval_ms: 10,
            deadline_secs,
        };
        let monitor = CredentialMonitor::new(source, settings.clone(), events, config);
        (monitor, settings, subscription)
    }

    async fn next_event(subscription: &mut EventSubscription) -> MonitorEvent {
        tokio::time::timeout(Duration::from_secs(2), subscription.recv())
            .await
            .expect("no event within 2s")
            .expect("bus closed")
    }

    #[tokio::test]
    async fn completes_once_credentials_appear() {
        let source = ScriptedSource::new(vec![Ok(None), Ok(None), Ok(Some(credentials()))]);
        let (monitor, settings, mut events) = monitor_with(source, 300);

        let session = monitor.start().await.unwrap();
        assert_eq!(session.state, MonitorState::Monitoring);

        let event = next_event(&mut events).await;
        assert_eq!(event, MonitorEvent::CredentialsUpdated(credentials()));
        assert_eq!(monitor.session().await.state, MonitorState::Completed);
        assert!(!monitor.is_monitoring().await);
        assert_eq!(
            Credentials::load(settings.as_ref()).unwrap(),
            Some(credentials())
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let (monitor, _, _events) = monitor_with(ScriptedSource::new(vec![]), 300);

        let first = monitor.start().await.unwrap();
        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyMonitoring));

        let current = monitor.session().await;
        assert_eq!(current.id, first.id);
        assert!(current.is_monitoring());
        monitor.cancel().await;
    }

    #[tokio::test]
    async fn cancel_is_silent_and_idempotent() {
        let (monitor, _, mut events) = monitor_with(ScriptedSource::new(vec![]), 300);

        monitor.cancel().await;
        monitor.start().await.unwrap();
        monitor.stop().await;
        assert!(!monitor.is_monitoring().await);
        assert_eq!(monitor.session().await.state, MonitorState::Cancelled);
        monitor.cancel().await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn late_credentials_after_cancel_are_dropped() {
        let source = ScriptedSource::new(vec![Ok(None), Ok(Some(credentials()))]);
        let (monitor, settings, mut events) = monitor_with(source, 300);

        monitor.start().await.unwrap();
        monitor.cancel().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(events.try_recv().is_none());
        assert_eq!(Credentials::load(settings.as_ref()).unwrap(), None);
    }

    #[tokio::test]
    async fn deadline_fails_with_one_error_event() {
        let (monitor, _, mut events) = monitor_with(ScriptedSource::new(vec![]), 0);

        monitor.start().await.unwrap();
        match next_event(&mut events).await {
            MonitorEvent::MonitoringError { message } => {
                assert_eq!(message, "No credentials detected within 0s")
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(monitor.session().await.state, MonitorState::Failed);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn source_error_fails_the_session() {
        let source = ScriptedSource::new(vec![Err(AppError::Other("scan exploded".into()))]);
        let (monitor, _, mut events) = monitor_with(source, 300);

        monitor.start().await.unwrap();
        assert_eq!(
            next_event(&mut events).await,
            MonitorEvent::MonitoringError {
                message: "scan exploded".into()
            }
        );
        assert_eq!(monitor.session().await.state, MonitorState::Failed);
    }

    #[tokio::test]
    async fn terminal_session_allows_restart() {
        let source = ScriptedSource::new(vec![Ok(Some(credentials()))]);
        let (monitor, _, mut events) = monitor_with(source, 300);

        let first = monitor.start().await.unwrap();
        next_event(&mut events).await;

        let second = monitor.start().await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(monitor.is_monitoring().await);
        monitor.cancel().await;
    }
}
