//! Serial device transport.
//!
//! The node's supervisor board shows up as an ACM-class USB serial device at
//! an unpredictable path, so the transport resolves a glob pattern against the
//! device directory, polling until a match appears. Reads go through the
//! blocking pool with the port's native timeout; the `serialport` crate has no
//! async read.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use globset::Glob;
use serialport::SerialPort;

use super::Transport;
use crate::error::{NodelineError, Result};

/// Default device path pattern (ACM-class USB serial).
pub const DEFAULT_DEVICE_PATTERN: &str = "/dev/ttyACM*";

/// Default baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Default interval between device directory scans.
pub const DEFAULT_GLOB_INTERVAL: Duration = Duration::from_secs(3);

/// A serial device yielding raw status-line bytes.
pub struct SerialTransport {
    /// Shared with per-read blocking tasks.
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    path: String,
}

impl SerialTransport {
    /// Resolve `pattern` to a device path and open it.
    ///
    /// Blocks (asynchronously) until a matching device exists; an open failure
    /// on the resolved path is fatal.
    pub async fn open(pattern: &str, baud_rate: u32, glob_interval: Duration) -> Result<Self> {
        let path = wait_for_device(pattern, glob_interval).await?;
        tracing::info!(device = %path, baud_rate, "opening serial transport");

        let port = serialport::new(&path, baud_rate)
            .timeout(Duration::from_millis(100))
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .open()?;

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            path,
        })
    }

    /// Open with the default pattern, baud rate and scan interval.
    pub async fn open_default() -> Result<Self> {
        Self::open(DEFAULT_DEVICE_PATTERN, DEFAULT_BAUD_RATE, DEFAULT_GLOB_INTERVAL).await
    }

    /// The resolved device path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for SerialTransport {
    async fn recv_timeout(&mut self, buf: &mut [u8], wait: Duration) -> Result<Option<usize>> {
        let port = Arc::clone(&self.port);
        let cap = buf.len();

        let chunk = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            let mut chunk = vec![0u8; cap];
            let mut port = port.lock().unwrap_or_else(|e| e.into_inner());
            port.set_timeout(wait)?;
            match port.read(&mut chunk) {
                // A zero-byte read on a serial line is idle, not closure.
                Ok(0) => Ok(None),
                Ok(n) => {
                    chunk.truncate(n);
                    Ok(Some(chunk))
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(|e| NodelineError::Io(std::io::Error::other(e)))??;

        match chunk {
            Some(chunk) => {
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(Some(chunk.len()))
            }
            None => Ok(None),
        }
    }
}

/// Poll the filesystem until a path matching `pattern` appears.
///
/// Retries indefinitely at `poll_interval`; when several paths match, the
/// lexicographically first wins.
pub async fn wait_for_device(pattern: &str, poll_interval: Duration) -> Result<String> {
    let matcher = Glob::new(pattern)?.compile_matcher();
    let dir = parent_dir(pattern);

    loop {
        if let Some(path) = scan_dir(&dir, &matcher) {
            return Ok(path.to_string_lossy().into_owned());
        }
        tracing::debug!(%pattern, "no matching device yet, rescanning");
        tokio::time::sleep(poll_interval).await;
    }
}

fn parent_dir(pattern: &str) -> PathBuf {
    match Path::new(pattern).parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn scan_dir(dir: &Path, matcher: &globset::GlobMatcher) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| matcher.is_match(p))
        .collect();
    matches.sort();
    matches.into_iter().next()
}
