//! # nodeline
//!
//! Line-framed JSON telemetry ingest for sensor node networks.
//!
//! Sensor nodes emit newline-delimited JSON status messages over two lossy
//! transports: a local UDP socket and a USB serial device. This crate
//! reassembles those bytes into complete frames regardless of how the
//! transport chunks them, decodes each frame, and normalizes the per-device
//! field variants into one canonical record shape grouped by sending node.
//!
//! ## Architecture
//!
//! - **Transports** ([`transport`]): UDP socket / serial device behind one
//!   timeout-bounded receive primitive
//! - **Framing** ([`framing`], [`reader`]): receive buffer + delimiter search;
//!   serial frames additionally validated against a firmware preamble
//! - **Pump** ([`pump`]): the read-decode loop on a background task, buffered
//!   into a pollable, cancelable queue
//! - **Normalization** ([`normalize`], [`group`]): declarative field
//!   transforms, then partition-by-sender
//!
//! Best-effort by design: malformed lines are logged and dropped, transport
//! loss is silent, and nothing persists across restarts.
//!
//! ## Example
//!
//! ```ignore
//! use nodeline::{BackgroundPump, FrameReader, Normalizer, UdpTransport};
//! use nodeline::group::group_by_sender;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> nodeline::Result<()> {
//!     let transport = UdpTransport::bind_default().await?;
//!     let mut pump = BackgroundPump::new(FrameReader::new(transport));
//!     pump.open();
//!
//!     let normalizer = Normalizer::standard();
//!     loop {
//!         pump.wait(Some(Duration::from_secs(5)), 1).await.ok();
//!         let records = normalizer.normalize_batch(pump.drain());
//!         for (sender, group) in group_by_sender(records).iter() {
//!             println!("{}: {} records", sender, group.len());
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod framing;
pub mod group;
pub mod normalize;
pub mod pump;
pub mod reader;
pub mod sink;
pub mod transport;

pub use config::Config;
pub use decode::{decode_line, Message};
pub use error::{NodelineError, Result};
pub use normalize::Normalizer;
pub use pump::BackgroundPump;
pub use reader::{FrameReader, PollStatus};
pub use transport::{SerialTransport, Transport, UdpTransport};
