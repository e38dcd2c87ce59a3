//! End-to-end tests of the bridge: inbound events through the ports, dispatch over a
//! recorded or simulated outbound port, and request retirement.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;

use liftbridge::bus::ports::{Bridge, InboundPort, LinkStatus, OutboundPort, PublishError};
use liftbridge::bus::sim;
use liftbridge::config;
use liftbridge::dispatcher::{DispatchPolicy, Dispatcher};
use liftbridge::request_store::{RequestStatus, RequestStore};
use liftbridge::state_mirror::StateMirror;

/// Outbound port that only records what the dispatcher publishes.
struct RecordingPort {
    published: Mutex<Vec<u8>>,
}

impl RecordingPort {
    fn new() -> Arc<Self> {
        Arc::new(RecordingPort {
            published: Mutex::new(Vec::new()),
        })
    }

    fn published(&self) -> Vec<u8> {
        self.published.lock().unwrap().clone()
    }
}

impl OutboundPort for RecordingPort {
    fn publish_floor_selection(&self, floor: u8) -> Result<(), PublishError> {
        self.published.lock().unwrap().push(floor);
        Ok(())
    }
}

fn fast_policy() -> DispatchPolicy {
    DispatchPolicy {
        publish_backoff_base: Duration::from_millis(1),
        dispatch_timeout: Duration::from_secs(5),
        ..DispatchPolicy::default()
    }
}

#[tokio::test]
async fn end_to_end_request_lifecycle() {
    let mirror = StateMirror::new();
    let store = RequestStore::new();
    let link = LinkStatus::new();
    link.set_connected(true);
    let bridge = Bridge::new(mirror.clone(), store.clone());
    let port = RecordingPort::new();
    let mut dispatcher = Dispatcher::new(
        store.clone(),
        mirror.clone(),
        link,
        port.clone(),
        fast_policy(),
    );

    // Request arrives on the control-plane topic.
    bridge.on_request_event(b"r1;2;5").unwrap();
    assert_eq!(store.len(), 1);

    // Dispatch tick issues the origin selection first.
    dispatcher.tick().await.unwrap();
    assert_eq!(port.published(), vec![2]);
    assert_eq!(store.status_of("r1"), Some(RequestStatus::Dispatched));

    // Lift reports the origin floor; the destination selection follows.
    bridge
        .on_state_event(config::TOPIC_CURRENT_FLOOR, b"2")
        .unwrap();
    dispatcher.tick().await.unwrap();
    assert_eq!(port.published(), vec![2, 5]);

    // Arrival at the destination plus a door-open event retires the request.
    bridge
        .on_state_event(config::TOPIC_CURRENT_FLOOR, b"5")
        .unwrap();
    dispatcher.tick().await.unwrap();
    assert_eq!(store.len(), 1);
    bridge
        .on_state_event(config::TOPIC_DOOR_STATE, b"open")
        .unwrap();
    dispatcher.tick().await.unwrap();
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn concurrent_request_events_land_exactly_once_each() {
    let mirror = StateMirror::new();
    let store = RequestStore::new();
    let bridge = Arc::new(Bridge::new(mirror, store.clone()));

    // Two callback threads race on every id; each id must land exactly once.
    let mut handles = Vec::new();
    for _round in 0..2 {
        let bridge = bridge.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..32u8 {
                let payload = format!("req-{};0;{}", i, i + 1);
                bridge.on_request_event(payload.as_bytes()).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.len(), 32);
    // Every id landed exactly once, with its fields intact.
    let snapshot = store.snapshot();
    for i in 0..32u8 {
        let matching: Vec<_> = snapshot
            .iter()
            .filter(|r| r.request_id == format!("req-{}", i))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].destination_floor, i + 1);
    }
}

#[tokio::test]
async fn simulated_lift_services_the_whole_queue() {
    let mirror = StateMirror::new();
    let store = RequestStore::new();
    let link = LinkStatus::new();
    let bridge: Arc<dyn InboundPort> = Arc::new(Bridge::new(mirror.clone(), store.clone()));

    let (bus, lift) = sim::new_pair(link.clone(), bridge.clone(), 6);
    let lift = lift.with_timing(Duration::from_millis(2), Duration::from_millis(12));
    link.set_connected(true);
    tokio::spawn(lift.run());

    let mut dispatcher = Dispatcher::new(
        store.clone(),
        mirror.clone(),
        link,
        Arc::new(bus),
        fast_policy(),
    );
    tokio::spawn(async move {
        loop {
            let _ = dispatcher.tick().await;
            sleep(Duration::from_millis(2)).await;
        }
    });

    bridge.on_request_event(b"a;1;3").unwrap();
    bridge.on_request_event(b"b;2;0").unwrap();

    // Poll until both requests are serviced, bounded so a regression fails fast.
    for _ in 0..500 {
        if store.is_empty() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "queue not drained, {} request(s) left: {:?}",
        store.len(),
        store.snapshot()
    );
}
