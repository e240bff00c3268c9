//! Configuration for the ingest pipeline.
//!
//! Loads configuration from a TOML file; every field has a default so an
//! empty file (or any subset of sections) is valid. All values are plain
//! scalars; durations are carried as integer milliseconds or seconds to keep
//! the file format simple.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NodelineError, Result};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub udp: UdpConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub pump: PumpConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

/// UDP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            host: crate::transport::DEFAULT_HOST.to_string(),
            port: crate::transport::DEFAULT_PORT,
        }
    }
}

/// Serial transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path glob, resolved by polling until a match appears.
    pub device: String,
    pub baud_rate: u32,
    /// Interval between device directory scans, in seconds.
    pub glob_interval_secs: u64,
    /// Inactivity timeout for serial polls, in seconds.
    pub read_timeout_secs: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: crate::transport::DEFAULT_DEVICE_PATTERN.to_string(),
            baud_rate: crate::transport::DEFAULT_BAUD_RATE,
            glob_interval_secs: 3,
            read_timeout_secs: 30,
        }
    }
}

impl SerialConfig {
    pub fn glob_interval(&self) -> Duration {
        Duration::from_secs(self.glob_interval_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Frame reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Frame delimiter byte.
    pub delimiter: u8,
    /// Per-read chunk size in bytes.
    pub chunk_size: usize,
    /// Idle backoff between receive attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b'\n',
            chunk_size: u16::MAX as usize,
            backoff_ms: 100,
        }
    }
}

impl ReaderConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Pump and consumer-loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Per-cycle poll timeout, in seconds.
    pub poll_timeout_secs: u64,
    /// Consumer poll interval (time between drains), in seconds.
    pub poll_interval_secs: u64,
    /// Poll cycles gathered per batch.
    pub batch_count: usize,
    /// Queue-length check interval while waiting, in milliseconds.
    pub wait_interval_ms: u64,
    /// Grace period for each shutdown phase, in milliseconds.
    pub shutdown_grace_ms: u64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            poll_timeout_secs: 1,
            poll_interval_secs: 5,
            batch_count: 3,
            wait_interval_ms: 100,
            shutdown_grace_ms: 1000,
        }
    }
}

impl PumpConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Convert to the pump's runtime config.
    pub fn to_pump_config(&self) -> crate::pump::PumpConfig {
        crate::pump::PumpConfig {
            poll_timeout: self.poll_timeout(),
            wait_interval: self.wait_interval(),
            shutdown_grace: self.shutdown_grace(),
        }
    }
}

/// Status file output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub out_dir: String,
    /// Width of one status-file time window, in seconds.
    pub bucket_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            out_dir: ".".to_string(),
            bucket_secs: 3600,
        }
    }
}

impl SinkConfig {
    pub fn bucket_width(&self) -> Duration {
        Duration::from_secs(self.bucket_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Bind the configured UDP endpoint and wrap it in a frame reader.
    pub async fn open_udp_reader(&self) -> Result<crate::FrameReader<crate::UdpTransport>> {
        let transport = crate::UdpTransport::bind(&self.udp.host, self.udp.port).await?;
        Ok(self.reader_over(transport))
    }

    /// Resolve and open the configured serial device, with serial framing.
    pub async fn open_serial_reader(&self) -> Result<crate::FrameReader<crate::SerialTransport>> {
        let transport = crate::SerialTransport::open(
            &self.serial.device,
            self.serial.baud_rate,
            self.serial.glob_interval(),
        )
        .await?;
        Ok(self.reader_over(transport).with_serial_framing())
    }

    fn reader_over<T: crate::Transport>(&self, transport: T) -> crate::FrameReader<T> {
        crate::FrameReader::new(transport)
            .with_delimiter(self.reader.delimiter)
            .with_chunk_size(self.reader.chunk_size)
            .with_backoff(self.reader.backoff())
    }

    /// Pump configuration for a serial reader.
    ///
    /// The serial inactivity timeout bounds each producer poll cycle, so a
    /// wedged device is noticed within one cycle.
    pub fn serial_pump_config(&self) -> crate::pump::PumpConfig {
        crate::pump::PumpConfig {
            poll_timeout: self.serial.read_timeout(),
            ..self.pump.to_pump_config()
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.udp.host.is_empty() {
            return Err(NodelineError::Config("udp.host must not be empty".into()));
        }
        if self.serial.device.is_empty() {
            return Err(NodelineError::Config(
                "serial.device must not be empty".into(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(NodelineError::Config(
                "serial.baud_rate must be greater than 0".into(),
            ));
        }
        if self.reader.chunk_size == 0 {
            return Err(NodelineError::Config(
                "reader.chunk_size must be greater than 0".into(),
            ));
        }
        if self.pump.batch_count == 0 {
            return Err(NodelineError::Config(
                "pump.batch_count must be greater than 0".into(),
            ));
        }
        if self.sink.bucket_secs == 0 {
            return Err(NodelineError::Config(
                "sink.bucket_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.udp.host, "127.0.0.1");
        assert_eq!(config.udp.port, 61393);
        assert_eq!(config.serial.device, "/dev/ttyACM*");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.reader.delimiter, b'\n');
        assert_eq!(config.pump.batch_count, 3);
        assert_eq!(config.sink.bucket_secs, 3600);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            [udp]
            port = 9999

            [serial]
            baud_rate = 115200
            "#,
        )
        .unwrap();

        assert_eq!(config.udp.port, 9999);
        assert_eq!(config.udp.host, "127.0.0.1");
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_zero_baud_rate_rejected() {
        let err = Config::parse("[serial]\nbaud_rate = 0");
        assert!(matches!(err, Err(NodelineError::Config(_))));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::parse("[reader]\nchunk_size = 0");
        assert!(matches!(err, Err(NodelineError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = Config::parse("[udp\nport=1");
        assert!(matches!(err, Err(NodelineError::Toml(_))));
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::default();

        assert_eq!(config.pump.poll_timeout(), Duration::from_secs(1));
        assert_eq!(config.pump.wait_interval(), Duration::from_millis(100));
        assert_eq!(config.reader.backoff(), Duration::from_millis(100));
        assert_eq!(config.serial.glob_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_serial_pump_config_uses_read_timeout() {
        let config = Config::parse("[serial]\nread_timeout_secs = 7").unwrap();

        let pump_config = config.serial_pump_config();
        assert_eq!(pump_config.poll_timeout, Duration::from_secs(7));
        assert_eq!(pump_config.wait_interval, config.pump.wait_interval());
    }

    #[tokio::test]
    async fn test_open_udp_reader_binds() {
        let config = Config::parse("[udp]\nport = 0").unwrap();

        let reader = config.open_udp_reader().await.unwrap();
        assert!(reader.transport().local_addr().is_ok());
    }
}
