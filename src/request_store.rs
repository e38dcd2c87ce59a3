//! ## Request Store Module
//!
//! This module defines the authoritative collection of pending lift requests. The store
//! is keyed by request id, preserves insertion order (which is the FIFO dispatch order),
//! and guards the per-request status transitions.
//!
//! ### Key Responsibilities:
//! - **Defining Core Structs**: [`LiftRequest`] and the [`RequestStatus`] enum.
//! - **Idempotent Insert**: a duplicate request id is a no-op, never double-queued.
//! - **Identifier-keyed Removal**: requests are removed by id lookup, never by position,
//!   so a removal can never corrupt an unrelated entry.
//! - **Transition Guards**: Pending → Dispatched → Completed only, no skipping and no
//!   regressing; violations surface as errors instead of being silently ignored.
//!
//! All operations are internally synchronized and may be called concurrently from the
//! inbound-event context and the dispatch-tick context.

use std::str;
use std::sync::{Arc, Mutex};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::config;

/// Errors raised by request parsing and the store's contract guards.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request payload is malformed: wrong field count, empty id, unparseable
    /// floor, or equal origin and destination. Such a request never enters the store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A status transition or lookup referenced an id not present in the store.
    /// Indicates a broken caller contract, not a normal condition.
    #[error("request {0:?} not found in store")]
    NotFound(String),

    /// A status transition was attempted out of order.
    #[error("request {id:?}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Id of the request the transition was attempted on.
        id: String,
        /// Status the request currently holds.
        from: RequestStatus,
        /// Status the caller tried to move it to.
        to: RequestStatus,
    },
}

/// Lifecycle status of a single lift request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Accepted, waiting for its turn at the head of the queue.
    Pending,
    /// Commands issued, waiting for the lift to confirm arrival.
    Dispatched,
    /// Arrival confirmed; about to be removed.
    Completed,
}

/// One lift-service request as accepted from the control-plane topic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LiftRequest {
    /// Unique id of the request, assigned by the requesting side.
    pub request_id: String,

    /// Floor the passenger waits on.
    pub origin_floor: u8,

    /// Floor the passenger wants to reach.
    pub destination_floor: u8,

    /// Current lifecycle status. New requests start as [`RequestStatus::Pending`].
    pub status: RequestStatus,
}

impl LiftRequest {
    /// Builds a pending request from already-validated fields.
    pub fn new(request_id: impl Into<String>, origin_floor: u8, destination_floor: u8) -> Self {
        LiftRequest {
            request_id: request_id.into(),
            origin_floor,
            destination_floor,
            status: RequestStatus::Pending,
        }
    }

    /// Parses the wire payload `request_id;origin_floor;destination_floor`.
    ///
    /// ## Parameters
    /// - `payload`: Raw payload bytes from the request topic.
    ///
    /// # Returns
    /// A pending [`LiftRequest`], or [`RequestError::InvalidRequest`] when the payload
    /// is not UTF-8, has the wrong field count, an empty id, or an unparseable floor.
    /// Equal origin and destination are caught later, at insert time.
    pub fn parse(payload: &[u8]) -> Result<Self, RequestError> {
        let text = str::from_utf8(payload)
            .map_err(|_| RequestError::InvalidRequest("payload is not valid UTF-8".to_string()))?;

        let fields: Vec<&str> = text.split(config::REQUEST_FIELD_DELIMITER).collect();
        if fields.len() != 3 {
            return Err(RequestError::InvalidRequest(format!(
                "expected 3 fields, got {}: {:?}",
                fields.len(),
                text
            )));
        }

        let request_id = fields[0].trim();
        if request_id.is_empty() {
            return Err(RequestError::InvalidRequest("empty request id".to_string()));
        }

        let origin_floor = parse_request_floor(fields[1], "origin_floor")?;
        let destination_floor = parse_request_floor(fields[2], "destination_floor")?;

        Ok(LiftRequest::new(request_id, origin_floor, destination_floor))
    }
}

fn parse_request_floor(field: &str, name: &str) -> Result<u8, RequestError> {
    field
        .trim()
        .parse::<u8>()
        .map_err(|_| RequestError::InvalidRequest(format!("bad {}: {:?}", name, field)))
}

/// Thread-safe, insertion-ordered collection of pending lift requests.
///
/// Internally a single id-keyed ordered list behind one mutex; there is deliberately no
/// second parallel collection to index into. The lock is held only for the in-memory
/// mutation, never across I/O.
#[derive(Clone, Default)]
pub struct RequestStore {
    inner: Arc<Mutex<Vec<LiftRequest>>>,
}

impl RequestStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        RequestStore::default()
    }

    /// Inserts a request at the tail of the FIFO order.
    ///
    /// Insertion is idempotent on the request id: a duplicate id is a no-op returning
    /// `Ok(false)`, leaving both size and order untouched, so the caller can log and
    /// drop it. A request whose origin equals its destination is rejected with
    /// [`RequestError::InvalidRequest`] and never enters the store.
    ///
    /// # Returns
    /// - `Ok(true)`: the request was appended.
    /// - `Ok(false)`: the id was already present, nothing changed.
    pub fn insert(&self, req: LiftRequest) -> Result<bool, RequestError> {
        if req.origin_floor == req.destination_floor {
            return Err(RequestError::InvalidRequest(format!(
                "origin and destination are both floor {}",
                req.origin_floor
            )));
        }

        let mut reqs = self.inner.lock().unwrap();
        if reqs.iter().any(|r| r.request_id == req.request_id) {
            return Ok(false);
        }
        reqs.push(req);
        Ok(true)
    }

    /// Returns a copy of the head of the FIFO order without removing it.
    pub fn peek_oldest(&self) -> Option<LiftRequest> {
        self.inner.lock().unwrap().first().cloned()
    }

    /// Transitions a request from Pending to Dispatched.
    pub fn mark_dispatched(&self, id: &str) -> Result<(), RequestError> {
        self.transition(id, RequestStatus::Dispatched)
    }

    /// Transitions a request from Dispatched to Completed.
    pub fn mark_completed(&self, id: &str) -> Result<(), RequestError> {
        self.transition(id, RequestStatus::Completed)
    }

    fn transition(&self, id: &str, to: RequestStatus) -> Result<(), RequestError> {
        let permitted_from = match to {
            RequestStatus::Pending => None,
            RequestStatus::Dispatched => Some(RequestStatus::Pending),
            RequestStatus::Completed => Some(RequestStatus::Dispatched),
        };

        let mut reqs = self.inner.lock().unwrap();
        let req = reqs
            .iter_mut()
            .find(|r| r.request_id == id)
            .ok_or_else(|| RequestError::NotFound(id.to_string()))?;

        if Some(req.status) != permitted_from {
            return Err(RequestError::InvalidTransition {
                id: id.to_string(),
                from: req.status,
                to,
            });
        }
        req.status = to;
        Ok(())
    }

    /// Removes a request by id lookup.
    ///
    /// # Returns
    /// `true` if the id was present and has now been removed, `false` if it was absent.
    /// Calling twice on the same id returns `true` at most once; the size can never go
    /// negative.
    pub fn remove(&self, id: &str) -> bool {
        let mut reqs = self.inner.lock().unwrap();
        let before = reqs.len();
        reqs.retain(|r| r.request_id != id);
        reqs.len() != before
    }

    /// Returns the status a request currently holds, if present.
    pub fn status_of(&self, id: &str) -> Option<RequestStatus> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.request_id == id)
            .map(|r| r.status)
    }

    /// True when no requests are pending.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Number of requests currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Copy of all requests in FIFO order, for the status table.
    pub fn snapshot(&self) -> Vec<LiftRequest> {
        self.inner.lock().unwrap().clone()
    }
}
