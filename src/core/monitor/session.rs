use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    #[default]
    Idle,
    Monitoring,
    Completed,
    Failed,
    Cancelled,
}

/// Snapshot of the current (or last) monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorSession {
    pub id: Option<Uuid>,
    pub state: MonitorState,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Default for MonitorSession {
    fn default() -> Self {
        Self::idle()
    }
}

impl MonitorSession {
    pub fn idle() -> Self {
        Self {
            id: None,
            state: MonitorState::Idle,
            started_at: None,
            deadline: None,
        }
    }

    pub fn begin(window: std::time::Duration) -> Self {
        let started_at = Utc::now();
        let deadline = chrono::Duration::from_std(window)
            .ok()
            .and_then(|window| started_at.checked_add_signed(window));
        Self {
            id: Some(Uuid::new_v4()),
            state: MonitorState::Monitoring,
            started_at: Some(started_at),
            deadline,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.state == MonitorState::Monitoring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_records_window() {
        let session = MonitorSession::begin(std::time::Duration::from_secs(300));
        assert!(session.is_monitoring());
        let span = session.deadline.unwrap() - session.started_at.unwrap();
        assert_eq!(span.num_seconds(), 300);
    }

    #[test]
    fn serializes_for_the_ui() {
        let value = serde_json::to_value(MonitorSession::idle()).unwrap();
        assert_eq!(value["state"], "idle");
        assert!(value["id"].is_null());
        assert_eq!(serde_json::to_value(MonitorState::Cancelled).unwrap(), "cancelled");
    }
}
