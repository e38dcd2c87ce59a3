//! # config.rs – Centralized Parameter Store
//!
//! This module holds all static program parameters used throughout the system.
//! Keeping configuration in one place makes tuning, experimentation, and testing easier.

use std::sync::Mutex;
use std::time::Duration;
use once_cell::sync::Lazy;

//
// ──────────────────────────────────────────────────────────────
//   1. TOPIC NAMESPACE (wire contract)
// ──────────────────────────────────────────────────────────────
//

/// State topic carrying the lift's current floor as a decimal ordinal
pub static TOPIC_CURRENT_FLOOR: &str = "lift/current_floor";

/// State topic carrying the lift's door state as a lowercase word
pub static TOPIC_DOOR_STATE: &str = "lift/door_state";

/// Control-plane topic carrying lift-service requests,
/// payload format `request_id;origin_floor;destination_floor`
pub static TOPIC_REQUEST: &str = "lift/request";

/// Command topic the adapter publishes floor selections on, payload `floor_id`
pub static TOPIC_FLOOR_SELECT: &str = "lift/command/floor_select";

/// Field delimiter in request payloads
pub const REQUEST_FIELD_DELIMITER: char = ';';

//
// ──────────────────────────────────────────────────────────────
//   2. SYSTEM & LIFT PARAMETERS
// ──────────────────────────────────────────────────────────────
//

/// Default number of floors when none is given on the command line
pub const DEFAULT_NUM_FLOORS: u8 = 4;

/// Duration between dispatch ticks
pub const DISPATCH_TICK: Duration = Duration::from_millis(100);

/// General polling frequency for try_recv loops (10 ms)
pub const POLL_PERIOD: Duration = Duration::from_millis(10);

/// How often the status table is printed
pub const STATUS_PRINT_INTERVAL: Duration = Duration::from_millis(500);

//
// ──────────────────────────────────────────────────────────────
//   3. TIMING & TIMEOUTS & RETRIES
// ──────────────────────────────────────────────────────────────
//

/// Max attempts for a single outbound floor-selection publish
pub const PUBLISH_MAX_ATTEMPTS: u32 = 3;

/// Base delay of the exponential publish backoff (doubles per attempt)
pub const PUBLISH_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Time a dispatched request may stay unconfirmed before escalation
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Travel time per floor in the simulated lift
pub const SIM_TRAVEL_PER_FLOOR: Duration = Duration::from_millis(400);

/// How long the simulated lift holds its door open on arrival
pub const SIM_DOOR_HOLD: Duration = Duration::from_millis(600);

/// Interval between synthetic demo requests from the sim generator
pub const SIM_REQUEST_INTERVAL: Duration = Duration::from_secs(5);

/// How often the link watchdog nags while the bus link is down
pub const LINK_NAG_INTERVAL: Duration = Duration::from_secs(2);

//
// ──────────────────────────────────────────────────────────────
//   4. LOGGING CONFIGURATION
// ──────────────────────────────────────────────────────────────
//

/// Enable/disable printing of the status table
pub static PRINT_STATUS_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of errors
pub static PRINT_ERR_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of warnings
pub static PRINT_WARN_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of success messages
pub static PRINT_OK_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable printing of general info
pub static PRINT_INFO_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(true));

/// Enable/disable machine-readable JSON status lines
pub static PRINT_JSON_ON: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));
