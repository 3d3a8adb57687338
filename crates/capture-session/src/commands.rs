//! Command boundary between the host UI and the capture session
//!
//! Accepts start/stop/switch requests, serializes them onto the session,
//! and acknowledges only once the state transition has fully applied.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{CommandError, CommandResult};
use crate::session::{CaptureSession, SessionStatus};

/// External control request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandRequest {
    /// Begin pumping frames; idempotent
    Start,
    /// Stop pumping; idempotent, quiescent on acknowledgment
    Stop,
    /// Retarget capture to `index` from the last enumeration
    Switch { index: usize },
}

impl CommandRequest {
    /// Parse an untyped payload from the host boundary.
    pub fn from_value(value: serde_json::Value) -> CommandResult<Self> {
        serde_json::from_value(value).map_err(|e| CommandError::InvalidCommand(e.to_string()))
    }
}

/// Acknowledgment returned once a command has fully applied
#[derive(Debug, Clone, Serialize)]
pub struct CommandAck {
    pub status: String,
    pub active_monitor: Option<usize>,
}

/// Serializes external commands onto one capture session.
///
/// No two commands execute concurrently, and none overlaps the session's
/// own switch/capture ordering.
pub struct SessionHandle {
    session: Arc<CaptureSession>,
    gate: Mutex<()>,
}

impl SessionHandle {
    pub fn new(session: Arc<CaptureSession>) -> Self {
        Self {
            session,
            gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> Arc<CaptureSession> {
        self.session.clone()
    }

    /// Apply one command and acknowledge it.
    pub async fn dispatch(&self, request: CommandRequest) -> CommandResult<CommandAck> {
        let _guard = self.gate.lock().await;
        debug!(?request, "dispatching command");

        match request {
            CommandRequest::Start => self.session.start()?,
            CommandRequest::Stop => self.session.stop().await,
            CommandRequest::Switch { index } => self.session.switch_monitor(index)?,
        }

        Ok(CommandAck {
            status: match self.session.status() {
                SessionStatus::Running => "running".to_string(),
                SessionStatus::Stopped => "stopped".to_string(),
            },
            active_monitor: self.session.active_monitor(),
        })
    }

    /// Parse and apply an untyped payload in one step.
    pub async fn dispatch_value(&self, value: serde_json::Value) -> CommandResult<CommandAck> {
        let request = CommandRequest::from_value(value)?;
        self.dispatch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use bytes::Bytes;
    use frame_source::{
        Frame, FrameSource, MonitorInfo, PixelFormat, SourceError, SourceResult,
    };
    use serde_json::json;

    struct StubSource {
        monitors: Vec<MonitorInfo>,
        active: usize,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                monitors: vec![
                    MonitorInfo::new(0, "display-0", 1920, 1080).unwrap(),
                    MonitorInfo::new(1, "display-1", 2560, 1440).unwrap(),
                ],
                active: 0,
            }
        }
    }

    impl FrameSource for StubSource {
        fn list_monitors(&mut self) -> SourceResult<Vec<MonitorInfo>> {
            Ok(self.monitors.clone())
        }

        fn capture_frame(&mut self) -> SourceResult<Frame> {
            let monitor = &self.monitors[self.active];
            let data = Bytes::from(vec![0u8; (monitor.width * monitor.height * 4) as usize]);
            Frame::new(
                data,
                monitor.width,
                monitor.height,
                PixelFormat::Bgra8,
                self.active,
            )
        }

        fn set_active_monitor(&mut self, index: usize) -> SourceResult<()> {
            if index >= self.monitors.len() {
                return Err(SourceError::InvalidMonitor(index));
            }
            self.active = index;
            Ok(())
        }
    }

    fn handle() -> SessionHandle {
        let (session, _rx) =
            CaptureSession::new(Box::new(StubSource::new()), SessionConfig::default());
        // The receiver may drop here; commands do not depend on a consumer.
        SessionHandle::new(Arc::new(session))
    }

    #[test]
    fn parses_well_formed_requests() {
        assert_eq!(
            CommandRequest::from_value(json!({"command": "start"})).unwrap(),
            CommandRequest::Start
        );
        assert_eq!(
            CommandRequest::from_value(json!({"command": "stop"})).unwrap(),
            CommandRequest::Stop
        );
        assert_eq!(
            CommandRequest::from_value(json!({"command": "switch", "index": 1})).unwrap(),
            CommandRequest::Switch { index: 1 }
        );
    }

    #[test]
    fn rejects_malformed_requests() {
        for payload in [
            json!({"command": "resize"}),
            json!({"command": "switch", "index": "one"}),
            json!({"command": "switch"}),
            json!(42),
        ] {
            assert!(matches!(
                CommandRequest::from_value(payload),
                Err(CommandError::InvalidCommand(_))
            ));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_acknowledges_applied_state() {
        let handle = handle();

        let ack = handle.dispatch(CommandRequest::Start).await.unwrap();
        assert_eq!(ack.status, "running");
        assert_eq!(ack.active_monitor, Some(0));

        let ack = handle
            .dispatch(CommandRequest::Switch { index: 1 })
            .await
            .unwrap();
        assert_eq!(ack.active_monitor, Some(1));

        let ack = handle.dispatch(CommandRequest::Stop).await.unwrap();
        assert_eq!(ack.status, "stopped");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_surfaces_invalid_monitor() {
        let handle = handle();
        handle.dispatch(CommandRequest::Start).await.unwrap();

        match handle.dispatch(CommandRequest::Switch { index: 9 }).await {
            Err(CommandError::InvalidMonitor(9)) => {}
            other => panic!("expected InvalidMonitor, got {:?}", other),
        }
        assert_eq!(handle.session().active_monitor(), Some(0));

        handle.dispatch(CommandRequest::Stop).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_value_parses_then_applies() {
        let handle = handle();

        let ack = handle
            .dispatch_value(json!({"command": "start"}))
            .await
            .unwrap();
        assert_eq!(ack.status, "running");

        assert!(matches!(
            handle.dispatch_value(json!({"command": "nope"})).await,
            Err(CommandError::InvalidCommand(_))
        ));

        handle.dispatch(CommandRequest::Stop).await.unwrap();
    }
}
