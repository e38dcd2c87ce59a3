//! ## Bus Ports Module
//!
//! Thin interfaces between the dispatch core and the message bus. The core has no
//! dependency on any concrete transport library; a transport binds itself to the core by
//! calling the [`InboundPort`] entry points and by implementing [`OutboundPort`].
//!
//! ## Key Features
//! - [`InboundPort`]: entry points for decoded state events and request events.
//! - [`OutboundPort`]: synchronous floor-selection publish towards the lift.
//! - [`LinkStatus`]: shared connection flag the dispatcher consults before dispatching.
//! - [`Bridge`]: the core-side endpoint routing inbound events into the state mirror
//!   and the request store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::print;
use crate::request_store::{LiftRequest, RequestError, RequestStore};
use crate::state_mirror::{ParseError, StateMirror};

/// Errors raised by an outbound publish attempt.
///
/// Publish failures are transient transport conditions; the dispatcher retries them with
/// bounded backoff before escalating.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The bus link is down; nothing was sent.
    #[error("bus link is down")]
    Disconnected,

    /// The transport refused or lost the message locally.
    #[error("publish rejected by transport: {0}")]
    Rejected(String),
}

/// Entry points a transport calls to deliver decoded inbound events to the core.
pub trait InboundPort: Send + Sync {
    /// Delivers one state event (current floor or door state).
    fn on_state_event(&self, topic: &str, payload: &[u8]) -> Result<(), ParseError>;

    /// Delivers one lift-service request event.
    fn on_request_event(&self, payload: &[u8]) -> Result<(), RequestError>;
}

/// Publish interface towards the lift controller.
///
/// `publish_floor_selection` is synchronous from the dispatcher's point of view: it
/// returns once the transport has locally acknowledged the publish attempt, not when the
/// physical lift has reacted. Implementations must be safe to call from the dispatch
/// task while inbound events arrive concurrently.
pub trait OutboundPort: Send + Sync {
    /// Publishes a floor selection on the command topic.
    fn publish_floor_selection(&self, floor: u8) -> Result<(), PublishError>;
}

/// Shared flag tracking whether the bus link is up.
///
/// The transport's connection lifecycle sets it; the dispatcher reads it each tick and
/// suppresses dispatch while the link is down, keeping requests queued instead of losing
/// them.
#[derive(Clone, Default)]
pub struct LinkStatus {
    connected: Arc<AtomicBool>,
}

impl LinkStatus {
    /// Creates a status starting out disconnected.
    pub fn new() -> Self {
        LinkStatus::default()
    }

    /// Records a connect or disconnect from the transport.
    pub fn set_connected(&self, up: bool) {
        self.connected.store(up, Ordering::SeqCst);
    }

    /// True while the bus link is up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Core-side endpoint of the inbound event flow.
///
/// Owns handles to the state mirror and the request store and routes each event kind to
/// the right one. Errors are returned to the transport for logging; a rejected event
/// never crashes the adapter.
#[derive(Clone)]
pub struct Bridge {
    mirror: StateMirror,
    store: RequestStore,
}

impl Bridge {
    /// Binds the bridge to the adapter's mirror and store handles.
    pub fn new(mirror: StateMirror, store: RequestStore) -> Self {
        Bridge { mirror, store }
    }
}

impl InboundPort for Bridge {
    fn on_state_event(&self, topic: &str, payload: &[u8]) -> Result<(), ParseError> {
        self.mirror.apply_state_event(topic, payload)
    }

    fn on_request_event(&self, payload: &[u8]) -> Result<(), RequestError> {
        let req = LiftRequest::parse(payload)?;
        let id = req.request_id.clone();
        if self.store.insert(req)? {
            print::info(format!("Accepted request {}", id));
        } else {
            // Duplicate delivery from the bus; idempotent no-op.
            print::warn(format!("Ignored duplicate request {}", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::state_mirror::DoorState;

    fn bridge() -> (Bridge, StateMirror, RequestStore) {
        let mirror = StateMirror::new();
        let store = RequestStore::new();
        (Bridge::new(mirror.clone(), store.clone()), mirror, store)
    }

    #[test]
    fn routes_state_events_to_the_mirror() {
        let (bridge, mirror, _) = bridge();
        bridge
            .on_state_event(config::TOPIC_DOOR_STATE, b"opening")
            .unwrap();
        assert_eq!(mirror.read().door_state, DoorState::Opening);
    }

    #[test]
    fn routes_request_events_to_the_store() {
        let (bridge, _, store) = bridge();
        bridge.on_request_event(b"r9;1;3").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.peek_oldest().unwrap().request_id, "r9");
    }

    #[test]
    fn duplicate_request_event_is_a_logged_no_op() {
        let (bridge, _, store) = bridge();
        bridge.on_request_event(b"r9;1;3").unwrap();
        bridge.on_request_event(b"r9;1;3").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn malformed_request_event_never_enters_the_store() {
        let (bridge, _, store) = bridge();
        assert!(bridge.on_request_event(b"r9;1").is_err());
        assert!(bridge.on_request_event(b"r9;1;1").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn link_status_flips() {
        let link = LinkStatus::new();
        assert!(!link.is_connected());
        link.set_connected(true);
        assert!(link.is_connected());
        link.set_connected(false);
        assert!(!link.is_connected());
    }
}
