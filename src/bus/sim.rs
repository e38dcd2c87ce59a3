//! ## Simulator Module
//!
//! In-process stand-in for the real message bus and lift controller, used by the demo
//! binary and the integration tests. The simulated lift consumes floor-selection
//! commands from the outbound port, travels floor by floor on a timer, and feeds state
//! events back into the core through the inbound port, including a full door cycle on
//! every arrival.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel as cbc;
use tokio::time::sleep;

use crate::bus::ports::{InboundPort, LinkStatus, OutboundPort, PublishError};
use crate::config;
use crate::print;

/// Outbound side of the simulated bus: forwards floor selections to the lift.
pub struct SimBus {
    link: LinkStatus,
    cmd_tx: cbc::Sender<u8>,
}

impl OutboundPort for SimBus {
    fn publish_floor_selection(&self, floor: u8) -> Result<(), PublishError> {
        if !self.link.is_connected() {
            return Err(PublishError::Disconnected);
        }
        self.cmd_tx
            .send(floor)
            .map_err(|_| PublishError::Rejected("command channel closed".to_string()))
    }
}

/// The simulated lift cab. Run it with [`SimLift::run`] in its own task.
pub struct SimLift {
    num_floors: u8,
    floor: u8,
    cmd_rx: cbc::Receiver<u8>,
    inbound: Arc<dyn InboundPort>,
    travel_per_floor: Duration,
    door_hold: Duration,
}

/// Builds a connected bus/lift pair sharing one command channel.
pub fn new_pair(
    link: LinkStatus,
    inbound: Arc<dyn InboundPort>,
    num_floors: u8,
) -> (SimBus, SimLift) {
    let (cmd_tx, cmd_rx) = cbc::unbounded();
    let bus = SimBus { link, cmd_tx };
    let lift = SimLift {
        num_floors,
        floor: 0,
        cmd_rx,
        inbound,
        travel_per_floor: config::SIM_TRAVEL_PER_FLOOR,
        door_hold: config::SIM_DOOR_HOLD,
    };
    (bus, lift)
}

impl SimLift {
    /// Overrides the simulated travel and door timings, mainly for tests.
    pub fn with_timing(mut self, travel_per_floor: Duration, door_hold: Duration) -> Self {
        self.travel_per_floor = travel_per_floor;
        self.door_hold = door_hold;
        self
    }

    /// Drives the cab forever: poll for a command, travel there, cycle the door.
    pub async fn run(mut self) {
        self.report(config::TOPIC_CURRENT_FLOOR, &self.floor.to_string());
        self.report(config::TOPIC_DOOR_STATE, "closed");

        loop {
            match self.cmd_rx.try_recv() {
                Ok(target) => self.travel_to(target).await,
                Err(_) => sleep(config::POLL_PERIOD).await,
            }
        }
    }

    async fn travel_to(&mut self, target: u8) {
        if target >= self.num_floors {
            print::warn(format!(
                "Sim lift ignoring floor {} (building has {} floors)",
                target, self.num_floors
            ));
            return;
        }

        while self.floor != target {
            sleep(self.travel_per_floor).await;
            if self.floor < target {
                self.floor += 1;
            } else {
                self.floor -= 1;
            }
            self.report(config::TOPIC_CURRENT_FLOOR, &self.floor.to_string());
        }

        // Arrival: full door cycle, so the adapter can confirm the stop.
        self.report(config::TOPIC_DOOR_STATE, "opening");
        sleep(self.door_hold / 4).await;
        self.report(config::TOPIC_DOOR_STATE, "open");
        sleep(self.door_hold).await;
        self.report(config::TOPIC_DOOR_STATE, "closing");
        sleep(self.door_hold / 4).await;
        self.report(config::TOPIC_DOOR_STATE, "closed");
    }

    fn report(&self, topic: &str, payload: &str) {
        if let Err(e) = self.inbound.on_state_event(topic, payload.as_bytes()) {
            print::warn(format!("Sim lift state event rejected: {}", e));
        }
    }
}

/// Feeds the adapter a synthetic lift request at a fixed interval, cycling through the
/// floors, so the demo binary exercises the whole dispatch loop.
pub async fn run_request_generator(inbound: Arc<dyn InboundPort>, num_floors: u8) {
    let mut n: u32 = 0;
    loop {
        sleep(config::SIM_REQUEST_INTERVAL).await;
        let origin = (n % num_floors as u32) as u8;
        let destination = ((n + 1) % num_floors as u32) as u8;
        let payload = format!("sim-{};{};{}", n, origin, destination);
        if let Err(e) = inbound.on_request_event(payload.as_bytes()) {
            print::warn(format!("Sim request rejected: {}", e));
        }
        n += 1;
    }
}

/// Nags in the log at a fixed interval while the bus link is down, so a dead broker
/// connection is visible to whoever watches the terminal.
pub async fn run_link_watchdog(link: LinkStatus) {
    loop {
        if !link.is_connected() {
            print::warn("Bus link down, attempting to reconnect".to_string());
        }
        sleep(config::LINK_NAG_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ports::Bridge;
    use crate::request_store::RequestStore;
    use crate::state_mirror::{DoorState, StateMirror};

    #[tokio::test]
    async fn sim_lift_reports_travel_and_door_cycle() {
        let mirror = StateMirror::new();
        let store = RequestStore::new();
        let bridge = Arc::new(Bridge::new(mirror.clone(), store));
        let link = LinkStatus::new();
        link.set_connected(true);

        let (bus, lift) = new_pair(link, bridge, 4);
        let lift = lift.with_timing(Duration::from_millis(2), Duration::from_millis(4));
        tokio::spawn(lift.run());

        bus.publish_floor_selection(2).unwrap();

        // Wait out the short simulated travel plus the door cycle.
        sleep(Duration::from_millis(100)).await;
        let state = mirror.read();
        assert_eq!(state.current_floor, Some(2));
        assert_eq!(state.door_state, DoorState::Closed);
    }

    #[tokio::test]
    async fn sim_bus_refuses_publish_while_disconnected() {
        let mirror = StateMirror::new();
        let store = RequestStore::new();
        let bridge = Arc::new(Bridge::new(mirror, store));
        let link = LinkStatus::new();

        let (bus, _lift) = new_pair(link.clone(), bridge, 4);
        assert_eq!(bus.publish_floor_selection(1), Err(PublishError::Disconnected));

        link.set_connected(true);
        assert_eq!(bus.publish_floor_selection(1), Ok(()));
    }
}
