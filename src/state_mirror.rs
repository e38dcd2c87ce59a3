//! ## State Mirror Module
//!
//! This module holds the last-known physical state of the lift: its current floor and its
//! door state. The mirror is the single local source of truth about the physical lift; it
//! is mutated only by inbound state events from the bus and read by the dispatcher to
//! decide when a request has actually arrived.
//!
//! ### Key Responsibilities:
//! - **Defining Core Structs**: [`LiftPhysicalState`] and the [`DoorState`] enum.
//! - **Applying State Events**: [`StateMirror::apply_state_event`] parses a state topic's
//!   payload and updates the matching field.
//! - **Unknown on parse failure**: a malformed payload sets the field to its Unknown
//!   sentinel instead of leaving a stale value, so the dispatcher never acts on data
//!   that failed to parse.
//! - **Snapshot Reads**: [`StateMirror::read`] returns an immutable copy, safe to call
//!   concurrently with event application.

use std::str::{self, FromStr};
use std::sync::{Arc, Mutex};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::config;

/// Errors raised while parsing an inbound state event.
///
/// A parse error is recovered locally: the affected field is set to its Unknown sentinel
/// and the error is returned to the caller for logging. The process never crashes on
/// malformed state payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The payload was not valid UTF-8 text.
    #[error("state payload is not valid UTF-8")]
    NotUtf8,

    /// The floor payload did not parse as a floor ordinal.
    #[error("invalid floor payload: {0:?}")]
    BadFloor(String),

    /// The door payload was not one of the known door states.
    #[error("invalid door state payload: {0:?}")]
    BadDoorState(String),

    /// The topic is not one of the state topics this mirror handles.
    #[error("unknown state topic: {0:?}")]
    UnknownTopic(String),
}

/// Represents the physical condition of the lift door.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    /// Door fully open.
    Open,
    /// Door fully closed.
    Closed,
    /// Door on its way open.
    Opening,
    /// Door on its way closed.
    Closing,
    /// No valid door report received (startup, or last payload was malformed).
    Unknown,
}

impl Default for DoorState {
    fn default() -> Self {
        DoorState::Unknown
    }
}

impl FromStr for DoorState {
    type Err = ParseError;

    /// Parses the wire representation used on `lift/door_state`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(DoorState::Open),
            "closed" => Ok(DoorState::Closed),
            "opening" => Ok(DoorState::Opening),
            "closing" => Ok(DoorState::Closing),
            other => Err(ParseError::BadDoorState(other.to_string())),
        }
    }
}

/// Snapshot of the last-known physical lift state.
///
/// `current_floor == None` is the Unknown floor sentinel, in effect until the first
/// well-formed floor event arrives (and again after a malformed one).
///
/// The two `_seq` fields are drawn from one shared event counter in the mirror: a
/// larger value means a later observation. They let a reader order the floor report
/// against the door report, which a plain field comparison cannot do.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiftPhysicalState {
    /// Floor the lift last reported, `None` when unknown.
    pub current_floor: Option<u8>,

    /// Door state the lift last reported.
    pub door_state: DoorState,

    /// Ordinal of the event that last updated `current_floor`; 0 before any event.
    pub floor_seq: u64,

    /// Ordinal of the event that last updated `door_state`; 0 before any event.
    pub door_seq: u64,
}

/// Thread-safe holder of the single [`LiftPhysicalState`] instance.
///
/// Cloning a `StateMirror` clones the handle, not the state; all clones observe the same
/// lift. The internal lock is held only for the in-memory field update or copy, never
/// across I/O.
#[derive(Clone, Default)]
pub struct StateMirror {
    state: Arc<Mutex<MirrorInner>>,
}

/// Snapshot plus the shared event counter feeding the `_seq` fields.
#[derive(Default)]
struct MirrorInner {
    snapshot: LiftPhysicalState,
    events: u64,
}

impl StateMirror {
    /// Creates a mirror with both fields at their Unknown sentinel.
    pub fn new() -> Self {
        StateMirror::default()
    }

    /// Applies one inbound state event to the mirror.
    ///
    /// The `topic` selects which field the payload concerns. On parse failure the field
    /// is overwritten with its Unknown sentinel and the [`ParseError`] is returned so the
    /// caller can log it; the previous value is deliberately not kept, since the lift has
    /// evidently moved on and the old reading would be stale.
    ///
    /// ## Parameters
    /// - `topic`: The state topic the event arrived on.
    /// - `payload`: The raw payload bytes.
    ///
    /// # Example
    /// ```
    /// use liftbridge::{config, state_mirror::StateMirror};
    ///
    /// let mirror = StateMirror::new();
    /// mirror.apply_state_event(config::TOPIC_CURRENT_FLOOR, b"3").unwrap();
    /// assert_eq!(mirror.read().current_floor, Some(3));
    /// ```
    pub fn apply_state_event(&self, topic: &str, payload: &[u8]) -> Result<(), ParseError> {
        if topic == config::TOPIC_CURRENT_FLOOR {
            let parsed = parse_floor(payload);
            let mut inner = self.state.lock().unwrap();
            inner.events += 1;
            inner.snapshot.floor_seq = inner.events;
            match parsed {
                Ok(floor) => {
                    inner.snapshot.current_floor = Some(floor);
                    Ok(())
                }
                Err(e) => {
                    inner.snapshot.current_floor = None;
                    Err(e)
                }
            }
        } else if topic == config::TOPIC_DOOR_STATE {
            let parsed = parse_door(payload);
            let mut inner = self.state.lock().unwrap();
            inner.events += 1;
            inner.snapshot.door_seq = inner.events;
            match parsed {
                Ok(door) => {
                    inner.snapshot.door_state = door;
                    Ok(())
                }
                Err(e) => {
                    inner.snapshot.door_state = DoorState::Unknown;
                    Err(e)
                }
            }
        } else {
            Err(ParseError::UnknownTopic(topic.to_string()))
        }
    }

    /// Returns an immutable snapshot of the current state.
    pub fn read(&self) -> LiftPhysicalState {
        self.state.lock().unwrap().snapshot
    }
}

fn parse_floor(payload: &[u8]) -> Result<u8, ParseError> {
    let text = str::from_utf8(payload).map_err(|_| ParseError::NotUtf8)?;
    text.trim()
        .parse::<u8>()
        .map_err(|_| ParseError::BadFloor(text.to_string()))
}

fn parse_door(payload: &[u8]) -> Result<DoorState, ParseError> {
    let text = str::from_utf8(payload).map_err(|_| ParseError::NotUtf8)?;
    text.parse::<DoorState>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unknown() {
        let mirror = StateMirror::new();
        let state = mirror.read();
        assert_eq!(state.current_floor, None);
        assert_eq!(state.door_state, DoorState::Unknown);
    }

    #[test]
    fn applies_floor_and_door_events() {
        let mirror = StateMirror::new();
        mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, b"2")
            .unwrap();
        mirror
            .apply_state_event(config::TOPIC_DOOR_STATE, b"open")
            .unwrap();
        let state = mirror.read();
        assert_eq!(state.current_floor, Some(2));
        assert_eq!(state.door_state, DoorState::Open);
    }

    #[test]
    fn malformed_floor_resets_to_unknown() {
        let mirror = StateMirror::new();
        mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, b"5")
            .unwrap();

        let err = mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, b"fifth")
            .unwrap_err();
        assert_eq!(err, ParseError::BadFloor("fifth".to_string()));
        // A bad payload must not leave the stale floor 5 behind.
        assert_eq!(mirror.read().current_floor, None);
    }

    #[test]
    fn malformed_door_resets_to_unknown() {
        let mirror = StateMirror::new();
        mirror
            .apply_state_event(config::TOPIC_DOOR_STATE, b"closed")
            .unwrap();

        let err = mirror
            .apply_state_event(config::TOPIC_DOOR_STATE, b"ajar")
            .unwrap_err();
        assert_eq!(err, ParseError::BadDoorState("ajar".to_string()));
        assert_eq!(mirror.read().door_state, DoorState::Unknown);
    }

    #[test]
    fn non_utf8_payload_is_rejected() {
        let mirror = StateMirror::new();
        let err = mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, &[0xff, 0xfe])
            .unwrap_err();
        assert_eq!(err, ParseError::NotUtf8);
        assert_eq!(mirror.read().current_floor, None);
    }

    #[test]
    fn event_ordinals_order_floor_against_door() {
        let mirror = StateMirror::new();
        mirror
            .apply_state_event(config::TOPIC_DOOR_STATE, b"open")
            .unwrap();
        mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, b"5")
            .unwrap();
        let state = mirror.read();
        assert!(state.door_seq < state.floor_seq);

        // A fresh door event lands after the floor report.
        mirror
            .apply_state_event(config::TOPIC_DOOR_STATE, b"open")
            .unwrap();
        let state = mirror.read();
        assert!(state.door_seq > state.floor_seq);
    }

    #[test]
    fn unknown_topic_is_rejected_without_touching_state() {
        let mirror = StateMirror::new();
        mirror
            .apply_state_event(config::TOPIC_CURRENT_FLOOR, b"1")
            .unwrap();
        let err = mirror
            .apply_state_event("lift/weight", b"750")
            .unwrap_err();
        assert_eq!(err, ParseError::UnknownTopic("lift/weight".to_string()));
        assert_eq!(mirror.read().current_floor, Some(1));
    }
}
