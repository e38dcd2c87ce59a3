//! ## Dispatcher Module
//!
//! The per-request state machine driving the lift. On every dispatch tick the dispatcher
//! looks at the head of the request store and the latest state-mirror snapshot, issues
//! floor-selection commands through the outbound port, and retires each request once the
//! lift has demonstrably serviced it.
//!
//! ### Key Responsibilities:
//! - **FIFO Dispatch**: requests leave the store in strict arrival order, one in flight
//!   at a time (single-lift invariant).
//! - **Two-leg Command Issue**: "select origin floor" (skipped when the lift already
//!   stands there), then "select destination floor" once the mirror confirms arrival at
//!   the origin.
//! - **Confirmed Completion**: a request completes only after the mirror reports the
//!   destination floor AND a door-open event observed after that floor report. Floor
//!   proximity alone is not trusted, so a lift passing a floor without stopping cannot
//!   retire a request; neither can a stale door-open left over from an earlier stop.
//! - **Bounded Retries**: failed publishes back off exponentially up to a limit, then
//!   the request is flagged stalled instead of being dropped or faked complete.
//! - **Timeout Escalation**: an unconfirmed request is re-dispatched once after the
//!   configured timeout, then flagged stalled for operator decision.
//!
//! Outbound publishes happen outside every store lock, so inbound event processing is
//! never blocked by a slow transport.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

use crate::bus::ports::{LinkStatus, OutboundPort, PublishError};
use crate::config;
use crate::print;
use crate::request_store::{RequestError, RequestStatus, RequestStore};
use crate::state_mirror::{DoorState, StateMirror};

/// Escalations reported by [`Dispatcher::tick`].
///
/// These never crash the adapter; the tick loop logs them and keeps running, with the
/// affected request retained in the store.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// All publish attempts for a command were exhausted.
    #[error("request {id:?}: publish failed after retries: {source}")]
    Publish {
        /// Id of the request whose command could not be published.
        id: String,
        /// The final transport error.
        source: PublishError,
    },

    /// A dispatched request stayed unconfirmed past the timeout, also after one
    /// automatic re-dispatch.
    #[error("request {id:?}: lift unresponsive, dispatch timed out")]
    Timeout {
        /// Id of the request that timed out.
        id: String,
    },

    /// The request store refused an operation, which indicates a broken internal
    /// contract rather than a runtime condition.
    #[error("request store contract violation: {0}")]
    Store(#[from] RequestError),
}

/// Completion discipline for dispatched requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Wait for the mirror to confirm destination floor plus an open door. Default.
    Confirmed,
    /// Complete as soon as the destination command is published. Unsafe: a lost
    /// publish retires a request the lift never serviced. Only reachable through the
    /// explicit opt-in flag.
    Optimistic,
}

/// Tunables governing one dispatcher instance.
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Completion discipline, [`CompletionPolicy::Confirmed`] unless overridden.
    pub completion: CompletionPolicy,
    /// Max attempts per outbound publish.
    pub publish_max_attempts: u32,
    /// Base delay of the exponential backoff between attempts.
    pub publish_backoff_base: Duration,
    /// Time a dispatched request may stay unconfirmed before escalation.
    pub dispatch_timeout: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        DispatchPolicy {
            completion: CompletionPolicy::Confirmed,
            publish_max_attempts: config::PUBLISH_MAX_ATTEMPTS,
            publish_backoff_base: config::PUBLISH_BACKOFF_BASE,
            dispatch_timeout: config::DISPATCH_TIMEOUT,
        }
    }
}

/// Which command leg the in-flight request is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    /// Waiting for the lift to reach the origin floor.
    ToOrigin,
    /// Destination command issued, waiting for confirmed arrival.
    ToDestination,
}

/// Book-keeping for the single request currently being driven.
#[derive(Debug)]
struct InFlight {
    id: String,
    origin: u8,
    destination: u8,
    leg: Leg,
    /// Destination floor seen on the mirror; reset if the lift moves away again.
    arrived: bool,
    /// Ordinal of the floor report that established `arrived`. Only a door-open with a
    /// later ordinal counts as confirmation, so a door that opened before the floor
    /// match (an earlier stop whose close events got lost) cannot complete the request.
    arrival_seq: u64,
    dispatched_at: Instant,
    redispatched: bool,
    /// Escalated and waiting for an operator; blocks the queue on purpose.
    stalled: bool,
}

/// Cloneable handle exposing the id of a stalled request to other tasks.
///
/// The dispatcher keeps it updated from the tick path; the status-print task reads it
/// so a stalled request shows up in the status table, not only as a one-shot error line.
#[derive(Clone, Default)]
pub struct StalledFlag {
    inner: Arc<std::sync::Mutex<Option<String>>>,
}

impl StalledFlag {
    /// Id of the stalled request blocking the queue, if any.
    pub fn get(&self) -> Option<String> {
        self.inner.lock().unwrap().clone()
    }

    fn set(&self, id: Option<String>) {
        *self.inner.lock().unwrap() = id;
    }
}

/// The dispatch engine. One instance drives one lift.
pub struct Dispatcher {
    store: RequestStore,
    mirror: StateMirror,
    link: LinkStatus,
    port: Arc<dyn OutboundPort>,
    policy: DispatchPolicy,
    in_flight: Option<InFlight>,
    stalled_flag: StalledFlag,
}

impl Dispatcher {
    /// Binds a dispatcher to its collaborators.
    pub fn new(
        store: RequestStore,
        mirror: StateMirror,
        link: LinkStatus,
        port: Arc<dyn OutboundPort>,
        policy: DispatchPolicy,
    ) -> Self {
        Dispatcher {
            store,
            mirror,
            link,
            port,
            policy,
            in_flight: None,
            stalled_flag: StalledFlag::default(),
        }
    }

    /// Id of the stalled request blocking the queue, if any.
    pub fn stalled_request(&self) -> Option<&str> {
        self.in_flight
            .as_ref()
            .filter(|fl| fl.stalled)
            .map(|fl| fl.id.as_str())
    }

    /// Hands out the shared stall handle, e.g. for the status-print task.
    pub fn stalled_flag(&self) -> StalledFlag {
        self.stalled_flag.clone()
    }

    /// Runs one dispatch tick.
    ///
    /// Evaluates the request store and the state mirror, possibly issues commands, and
    /// possibly retires the in-flight request. Every wait inside a tick is bounded by
    /// the retry policy; the tick never blocks on the physical lift.
    ///
    /// Returns an escalation as `Err` exactly once per incident; later ticks on a
    /// stalled request are quiet no-ops until an operator intervenes.
    pub async fn tick(&mut self) -> Result<(), DispatchError> {
        // No dispatch while the bus link is down. Requests stay queued.
        if !self.link.is_connected() {
            return Ok(());
        }

        if self.in_flight.is_some() {
            self.advance().await
        } else {
            self.start_next().await
        }
    }

    /// Promotes the head of the queue to Dispatched and issues its first command.
    async fn start_next(&mut self) -> Result<(), DispatchError> {
        let req = match self.store.peek_oldest() {
            Some(req) => req,
            None => return Ok(()),
        };

        self.store.mark_dispatched(&req.request_id)?;
        let mut fl = InFlight {
            id: req.request_id.clone(),
            origin: req.origin_floor,
            destination: req.destination_floor,
            leg: Leg::ToOrigin,
            arrived: false,
            arrival_seq: 0,
            dispatched_at: Instant::now(),
            redispatched: false,
            stalled: false,
        };

        let snapshot = self.mirror.read();
        let result = if snapshot.current_floor == Some(req.origin_floor) {
            // Lift already stands at the origin, go straight for the destination.
            fl.leg = Leg::ToDestination;
            self.publish_with_retry(&fl.id, req.destination_floor).await
        } else {
            self.publish_with_retry(&fl.id, req.origin_floor).await
        };

        match result {
            Ok(()) => {
                print::info(format!(
                    "Dispatching {}: floor {} -> {}",
                    fl.id, fl.origin, fl.destination
                ));
                let optimistic_done =
                    fl.leg == Leg::ToDestination && self.policy.completion == CompletionPolicy::Optimistic;
                self.in_flight = Some(fl);
                if optimistic_done {
                    let id = req.request_id.clone();
                    self.retire(&id)?;
                }
                Ok(())
            }
            Err(e) => {
                fl.stalled = true;
                self.in_flight = Some(fl);
                self.stalled_flag
                    .set(self.in_flight.as_ref().map(|fl| fl.id.clone()));
                print::err(format!("{}", e));
                Err(e)
            }
        }
    }

    /// Advances the in-flight request based on the latest mirror snapshot.
    async fn advance(&mut self) -> Result<(), DispatchError> {
        let snapshot = self.mirror.read();

        let fl = match self.in_flight.as_mut() {
            Some(fl) => fl,
            None => return Ok(()),
        };
        if fl.stalled {
            // Already escalated; hold the queue for the operator.
            return Ok(());
        }

        match fl.leg {
            Leg::ToOrigin => {
                if snapshot.current_floor == Some(fl.origin) {
                    let (id, destination) = (fl.id.clone(), fl.destination);
                    match self.publish_with_retry(&id, destination).await {
                        Ok(()) => {
                            // Re-borrow; the entry could not stay borrowed across the await.
                            if let Some(fl) = self.in_flight.as_mut() {
                                fl.leg = Leg::ToDestination;
                            }
                            if self.policy.completion == CompletionPolicy::Optimistic {
                                self.retire(&id)?;
                            }
                            Ok(())
                        }
                        Err(e) => self.escalate(e),
                    }
                } else {
                    self.check_timeout().await
                }
            }
            Leg::ToDestination => {
                if snapshot.current_floor == Some(fl.destination) {
                    if !fl.arrived {
                        fl.arrived = true;
                        fl.arrival_seq = snapshot.floor_seq;
                    }
                } else if fl.arrived {
                    // The lift moved on without opening its door: it only passed the
                    // destination floor, so the arrival note is withdrawn.
                    fl.arrived = false;
                }

                // The door-open must postdate the floor match; a snapshot still showing
                // an earlier stop's open door is not confirmation.
                if fl.arrived
                    && snapshot.door_state == DoorState::Open
                    && snapshot.door_seq > fl.arrival_seq
                {
                    let id = fl.id.clone();
                    print::ok(format!("Request {} serviced at floor {}", id, fl.destination));
                    self.retire(&id)?;
                    Ok(())
                } else {
                    self.check_timeout().await
                }
            }
        }
    }

    /// Completes and removes the in-flight request.
    ///
    /// Removal is guarded on the status being exactly Completed, so a duplicate
    /// completion signal can never remove a second, unrelated entry.
    fn retire(&mut self, id: &str) -> Result<(), DispatchError> {
        self.store.mark_completed(id)?;
        if self.store.status_of(id) == Some(RequestStatus::Completed) {
            self.store.remove(id);
        }
        self.in_flight = None;
        self.stalled_flag.set(None);
        Ok(())
    }

    /// Escalates an unconfirmed request: one automatic re-dispatch, then stall.
    async fn check_timeout(&mut self) -> Result<(), DispatchError> {
        let (id, target, expired, redispatched) = match self.in_flight.as_ref() {
            Some(fl) => (
                fl.id.clone(),
                match fl.leg {
                    Leg::ToOrigin => fl.origin,
                    Leg::ToDestination => fl.destination,
                },
                fl.dispatched_at.elapsed() > self.policy.dispatch_timeout,
                fl.redispatched,
            ),
            None => return Ok(()),
        };
        if !expired {
            return Ok(());
        }

        if !redispatched {
            print::warn(format!(
                "Request {} unconfirmed after {:?}, re-dispatching floor {}",
                id, self.policy.dispatch_timeout, target
            ));
            let result = self.publish_with_retry(&id, target).await;
            if let Some(fl) = self.in_flight.as_mut() {
                fl.redispatched = true;
                fl.dispatched_at = Instant::now();
            }
            match result {
                Ok(()) => Ok(()),
                Err(e) => self.escalate(e),
            }
        } else {
            self.escalate(DispatchError::Timeout { id })
        }
    }

    /// Flags the in-flight request stalled and reports the escalation once.
    fn escalate(&mut self, e: DispatchError) -> Result<(), DispatchError> {
        if let Some(fl) = self.in_flight.as_mut() {
            fl.stalled = true;
        }
        self.stalled_flag
            .set(self.in_flight.as_ref().map(|fl| fl.id.clone()));
        print::err(format!("{}", e));
        Err(e)
    }

    /// Publishes one floor selection with bounded exponential backoff.
    ///
    /// No lock is held here; a slow or failing transport delays only the dispatch task.
    async fn publish_with_retry(&self, id: &str, floor: u8) -> Result<(), DispatchError> {
        let mut delay = self.policy.publish_backoff_base;
        let mut attempt = 1;
        loop {
            match self.port.publish_floor_selection(floor) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    print::warn(format!(
                        "Publish of floor {} failed (attempt {}/{}): {}",
                        floor, attempt, self.policy.publish_max_attempts, e
                    ));
                    if attempt >= self.policy.publish_max_attempts {
                        return Err(DispatchError::Publish {
                            id: id.to_string(),
                            source: e,
                        });
                    }
                    sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}
