#![warn(missing_docs)]
//! # This projects library
//!
//! This library bridges a pub/sub message bus and a single lift controller. It mirrors the
//! lift's physical state from the bus into local state, queues incoming lift-service
//! requests, and drives the lift by publishing floor-selection commands until every
//! request is serviced.
//!
//! ## Overview
//! - **Config**: Handles configuration settings.
//! - **Print**: Colored terminal logging and the status table.
//! - **Init**: Argument parsing and settings assembly.
//! - **State Mirror**: Last-known physical lift state, fed by inbound state events.
//! - **Request Store**: FIFO set of pending lift requests, keyed by request id.
//! - **Dispatcher**: The per-request state machine issuing outbound commands.
//! - **Bus**: Port traits towards the message bus, plus an in-process simulator.

/// Global variables
pub mod config;

/// Print functions with color coding
pub mod print;

/// Initialize functions
pub mod init;

/// Last-known physical state of the lift, updated by inbound state events.
pub mod state_mirror;

/// The pending-request set with FIFO dispatch order.
pub mod request_store;

/// Dispatch state machine: issues floor commands and retires requests.
pub mod dispatcher;

/// Interfaces towards the message bus.
pub mod bus {
    /// Port traits and the core-side bridge endpoint.
    pub mod ports;
    /// In-process simulated broker and lift.
    pub mod sim;
}
