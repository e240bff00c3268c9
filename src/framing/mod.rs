//! Framing module - turning raw transport bytes into discrete frames.
//!
//! This module implements line framing for the telemetry wire:
//! - [`LineBuffer`] accumulates partial reads and extracts delimiter-terminated frames
//! - [`sanitize_serial_frame`] validates and repairs serial-mode frames before decode

mod line_buffer;
mod preamble;

pub use line_buffer::{LineBuffer, DEFAULT_DELIMITER};
pub use preamble::{sanitize_serial_frame, FRAME_PREAMBLE};
