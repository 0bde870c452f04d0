//! Event Publisher Implementation
//!
//! 向前端推送会话状态变化与用户提示（替代 UI toast）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::control::{SessionId, SessionSnapshot, SessionStatus};

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 控制事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ControlEvent {
    /// 会话状态变更
    StatusChanged {
        from: SessionStatus,
        to: SessionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        pending: bool,
        at: DateTime<Utc>,
    },
    /// 面向用户的提示
    Notice {
        level: NoticeLevel,
        message: String,
        at: DateTime<Utc>,
    },
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<ControlEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.channel.subscribe()
    }

    /// 发布状态变更事件（状态未变时不发布）
    pub fn publish_status_changed(&self, from: SessionStatus, snapshot: &SessionSnapshot) {
        if from == snapshot.status {
            return;
        }
        self.publish(ControlEvent::StatusChanged {
            from,
            to: snapshot.status,
            session_id: snapshot.session_id.clone(),
            pending: snapshot.pending,
            at: snapshot.updated_at,
        });
    }

    pub fn notify_info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message);
    }

    pub fn notify_success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    pub fn notify_warning(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Warning, message);
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.publish(ControlEvent::Notice {
            level,
            message: message.into(),
            at: Utc::now(),
        });
    }

    fn publish(&self, event: ControlEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control::SessionStateMachine;

    #[tokio::test]
    async fn test_notice_reaches_subscriber() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.notify_warning("No robots are connected. AI control will not work.");

        match rx.recv().await.unwrap() {
            ControlEvent::Notice { level, message, .. } => {
                assert_eq!(level, NoticeLevel::Warning);
                assert!(message.contains("No robots"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unchanged_status_is_not_published() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();
        let snapshot = SessionStateMachine::new().snapshot();

        publisher.publish_status_changed(SessionStatus::Stopped, &snapshot);
        assert!(rx.try_recv().is_err());

        publisher.publish_status_changed(SessionStatus::Running, &snapshot);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ControlEvent::StatusChanged {
                to: SessionStatus::Stopped,
                ..
            }
        ));
    }

    #[test]
    fn test_event_wire_format() {
        let event = ControlEvent::Notice {
            level: NoticeLevel::Success,
            message: "AI control paused successfully".to_string(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "Notice");
        assert_eq!(json["data"]["level"], "success");
    }
}
