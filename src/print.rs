//! ## Printing Module
//!
//! This module is only here to make logging in the terminal easier to read.
//! It allows to print in appropriate colors depending on the situation.
//! It also provides a nice print-format for the adapter's status: the mirrored lift
//! state and the pending request queue.

use crate::bus::ports::LinkStatus;
use crate::config;
use crate::request_store::{LiftRequest, RequestStatus};
use crate::state_mirror::{DoorState, LiftPhysicalState};

use ansi_term::Colour::{self, Green, Red, Yellow, Purple, White};
use unicode_width::UnicodeWidthStr;

/// Prints an error message in red to the terminal.
///
/// If `PRINT_ERR_ON` is `false`, the message will not be printed.
///
/// ## Parameters
/// - `msg`: The error message to print.
///
/// ## Terminal output
/// - "\[ERROR\]:   {}", msg
///
/// ## Example
/// ```
/// use liftbridge::print;
///
/// print::err("Something went wrong!".to_string());
/// ```
pub fn err(msg: String) {
    let print_stat = config::PRINT_ERR_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}\n", Red.paint("[ERROR]:   "), Red.paint(msg));
    }
}

/// Prints a warning message in yellow to the terminal.
///
/// If `PRINT_WARN_ON` is `false`, the message will not be printed.
///
/// ## Parameters
/// - `msg`: The warning message to print.
///
/// ## Terminal output
/// - "\[WARNING\]: {}", msg
pub fn warn(msg: String) {
    let print_stat = config::PRINT_WARN_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}\n", Yellow.paint("[WARNING]: "), Yellow.paint(msg));
    }
}

/// Prints a success message in green to the terminal.
///
/// If `PRINT_OK_ON` is `false`, the message will not be printed.
///
/// ## Parameters
/// - `msg`: The success message to print.
///
/// ## Terminal output
/// - "\[OK\]:      {}", msg
pub fn ok(msg: String) {
    let print_stat = config::PRINT_OK_ON.lock().unwrap().clone();

    if print_stat {
        println!("{}{}\n", Green.paint("[OK]:      "), Green.paint(msg));
    }
}

/// Prints an informational message in light blue to the terminal.
///
/// If `PRINT_INFO_ON` is `false`, the message will not be printed.
///
/// ## Parameters
/// - `msg`: The informational message to print.
///
/// ## Terminal output
/// - "\[INFO\]:    {}", msg
pub fn info(msg: String) {
    let print_stat = config::PRINT_INFO_ON.lock().unwrap().clone();

    let light_blue = Colour::RGB(102, 178, 255);
    if print_stat {
        println!("{}{}\n", light_blue.paint("[INFO]:    "), light_blue.paint(msg));
    }
}

/// Pads the input text to a fixed display width using spaces.
///
/// Accounts for characters that may take more than one column width (e.g. Unicode symbols),
/// ensuring aligned text in terminal-based tables.
///
/// # Parameters
/// - `text`: The string to pad.
/// - `width`: The total width the text should occupy (including padding).
///
/// # Returns
/// A `String` with the original text left-aligned and padded with spaces to match the desired width.
fn pad_text(text: &str, width: usize) -> String {
    let visible_width = UnicodeWidthStr::width(text);
    let padding = width.saturating_sub(visible_width);
    format!("{}{}", text, " ".repeat(padding))
}

/// Returns a colored and padded string representation of a boolean value.
///
/// Uses green for `true` and red for `false`, and pads the result to a fixed width.
///
/// # Parameters
/// - `value`: The boolean value to represent.
/// - `width`: The width to pad the output to.
///
/// # Returns
/// A colored `String` containing "true" or "false", padded to the given width.
fn colored_bool_label(value: bool, width: usize) -> String {
    let raw_text = if value { "true" } else { "false" };
    let padded = pad_text(raw_text, width);
    if value {
        Green.paint(padded).to_string()
    } else {
        Red.paint(padded).to_string()
    }
}

fn door_label(door: DoorState) -> String {
    match door {
        DoorState::Open => Yellow.paint("Open").to_string(),
        DoorState::Closed => Green.paint("Closed").to_string(),
        DoorState::Opening => Yellow.paint("Opening").to_string(),
        DoorState::Closing => Yellow.paint("Closing").to_string(),
        DoorState::Unknown => Red.paint("Unknown").to_string(),
    }
}

fn status_label(status: RequestStatus, stalled: bool) -> String {
    if stalled {
        return Red.paint("STALLED").to_string();
    }
    match status {
        RequestStatus::Pending => White.paint("Pending").to_string(),
        RequestStatus::Dispatched => Yellow.paint("Dispatched").to_string(),
        RequestStatus::Completed => Green.paint("Completed").to_string(),
    }
}

/// Logs the adapter's current status to the terminal in a structured and colorized table format.
///
/// This function visually presents:
/// - Bus link status
/// - The mirrored lift state (current floor, door state)
/// - Every pending request in FIFO order with its lifecycle status
///
/// # Parameters
/// - `state`: The latest state-mirror snapshot.
/// - `requests`: Snapshot of the request store in FIFO order.
/// - `link`: The bus link status.
/// - `stalled`: Id of a stalled request blocking the queue, if any.
///
/// # Behavior
/// - If configured printing is disabled (`config::PRINT_STATUS_ON` is false), the function exits early.
/// - If `config::PRINT_JSON_ON` is enabled, a machine-readable JSON line is printed as well.
///
/// # Notes
/// - This is intended for human-readable debugging and monitoring purposes.
/// - Printing frequency should be limited (e.g., once per 500 ms).
pub fn status(
    state: &LiftPhysicalState,
    requests: &[LiftRequest],
    link: &LinkStatus,
    stalled: Option<&str>,
) {
    let print_stat = config::PRINT_STATUS_ON.lock().unwrap().clone();
    if !print_stat {
        return;
    }

    let floor_text = match state.current_floor {
        Some(floor) => floor.to_string(),
        None => Red.paint("?").to_string(),
    };

    println!("{}", Purple.bold().paint("┌────────────────────────────────┐"));
    println!("{}", Purple.bold().paint("│        LIFT BRIDGE STATUS      │"));
    println!("{}", Purple.bold().paint("└────────────────────────────────┘"));
    println!("┌────────────────────────────────┐");
    println!("│ Bus link up:          {} │", colored_bool_label(link.is_connected(), 8));
    println!("│ Current floor:        {} │", pad_text(&floor_text, 17));
    println!("│ Door:                 {} │", pad_text(&door_label(state.door_state), 17));
    println!("└────────────────────────────────┘");

    println!("┌──────────┬────────┬────────┬────────────┐");
    println!("{}", White.bold().paint("│ Request  │ Origin │ Dest   │ Status     │"));
    println!("├──────────┼────────┼────────┼────────────┤");
    if requests.is_empty() {
        println!("│ (none)   │        │        │            │");
    }
    for req in requests {
        let is_stalled = stalled == Some(req.request_id.as_str());
        println!(
            "│ {} │ {:<6} │ {:<6} │ {} │",
            pad_text(&req.request_id, 8),
            req.origin_floor,
            req.destination_floor,
            pad_text(&status_label(req.status, is_stalled), 19),
        );
    }
    println!("└──────────┴────────┴────────┴────────────┘");

    let json_stat = config::PRINT_JSON_ON.lock().unwrap().clone();
    if json_stat {
        match serde_json::to_string(&(state, requests)) {
            Ok(line) => println!("{}", line),
            Err(e) => err(format!("Could not serialize status line: {}", e)),
        }
    }
}
