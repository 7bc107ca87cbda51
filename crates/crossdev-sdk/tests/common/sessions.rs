//! Recording stand-in for the UI transport

use crossdev_core::types::SdkManagementMsg;
use crossdev_sdk::{CrossSdk, EventSink, SessionRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const SESSION_ID: &str = "sess-1234";

/// Collects every emitted event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, SdkManagementMsg)>>,
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &str, msg: &SdkManagementMsg) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), msg.clone()));
        Ok(())
    }
}

/// Registry with a single session that can be disconnected
pub struct RecordingSessions {
    sink: Arc<RecordingSink>,
    connected: AtomicBool,
}

impl RecordingSessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sink: Arc::new(RecordingSink::default()),
            connected: AtomicBool::new(true),
        })
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn event_names(&self) -> Vec<String> {
        self.sink
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<SdkManagementMsg> {
        self.sink
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Events of one command
    pub fn events_for(&self, cmd_id: &str) -> Vec<SdkManagementMsg> {
        self.events()
            .into_iter()
            .filter(|e| e.cmd_id == cmd_id)
            .collect()
    }

    /// Wait until the terminal event of `cmd_id` was emitted
    pub async fn wait_for_exit(&self, cmd_id: &str) -> Vec<SdkManagementMsg> {
        let deadline = Instant::now() + Duration::from_secs(20);
        loop {
            let events = self.events_for(cmd_id);
            if events.iter().any(|e| e.exited) {
                return events;
            }
            assert!(
                Instant::now() < deadline,
                "no exit event for {} (got {:?})",
                cmd_id,
                events
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl SessionRegistry for RecordingSessions {
    fn sink(&self, session_id: &str) -> Option<Arc<dyn EventSink>> {
        if session_id == SESSION_ID && self.connected.load(Ordering::SeqCst) {
            Some(self.sink.clone() as Arc<dyn EventSink>)
        } else {
            None
        }
    }
}

/// Wait until the SDK no longer has a job attached
pub async fn wait_until_idle(sdk: &CrossSdk) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while sdk.is_busy() {
        assert!(Instant::now() < deadline, "job still attached");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
