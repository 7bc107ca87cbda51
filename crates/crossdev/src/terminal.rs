//! Session registry backed by the terminal
//!
//! The CLI is its own single UI session: progress events are forwarded over
//! a channel to the command printing them.

use crossdev_core::types::SdkManagementMsg;
use crossdev_sdk::{EventSink, SessionRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Session id used by every CLI request
pub const CLI_SESSION: &str = "cli";

struct ChannelSink {
    tx: mpsc::UnboundedSender<SdkManagementMsg>,
}

impl EventSink for ChannelSink {
    fn emit(&self, _event: &str, msg: &SdkManagementMsg) -> anyhow::Result<()> {
        self.tx
            .send(msg.clone())
            .map_err(|_| anyhow::anyhow!("terminal session closed"))
    }
}

/// Registry knowing only [`CLI_SESSION`]
pub struct TerminalSessions {
    sink: Arc<ChannelSink>,
}

impl TerminalSessions {
    /// Create the registry and the receiving end of its events
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<SdkManagementMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sessions = Arc::new(Self {
            sink: Arc::new(ChannelSink { tx }),
        });
        (sessions, rx)
    }
}

impl SessionRegistry for TerminalSessions {
    fn sink(&self, session_id: &str) -> Option<Arc<dyn EventSink>> {
        (session_id == CLI_SESSION).then(|| self.sink.clone() as Arc<dyn EventSink>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossdev_core::types::Sdk;

    #[tokio::test]
    async fn test_events_reach_the_channel() {
        let (sessions, mut rx) = TerminalSessions::channel();
        let sink = sessions.sink(CLI_SESSION).unwrap();

        let msg = SdkManagementMsg::exited("sdk-install-1", Sdk::default(), 0, String::new());
        sink.emit("event:sdk-install", &msg).unwrap();

        assert_eq!(rx.recv().await.unwrap(), msg);
    }

    #[test]
    fn test_other_sessions_are_unknown() {
        let (sessions, _rx) = TerminalSessions::channel();
        assert!(sessions.sink("browser-42").is_none());
    }
}
