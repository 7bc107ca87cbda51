//! Transport boundary
//!
//! The UI transport is external. The installer only needs to look up the
//! socket of a session by id right before emitting, and to tolerate the
//! session being gone.

use crossdev_core::types::SdkManagementMsg;
use std::sync::Arc;

/// A live connection able to receive progress events
pub trait EventSink: Send + Sync {
    /// Send one event; `event` is the transport event name
    fn emit(&self, event: &str, msg: &SdkManagementMsg) -> anyhow::Result<()>;
}

/// Maps session ids to live connections
pub trait SessionRegistry: Send + Sync {
    /// `None` when the session is unknown or disconnected
    fn sink(&self, session_id: &str) -> Option<Arc<dyn EventSink>>;
}

/// Registry that knows no session; every event is dropped
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessions;

impl SessionRegistry for NoSessions {
    fn sink(&self, _session_id: &str) -> Option<Arc<dyn EventSink>> {
        None
    }
}
