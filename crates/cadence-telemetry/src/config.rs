//! Telemetry connection settings.

use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Port the live consumer listens on by default.
pub const DEFAULT_PORT: u16 = 5555;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`TelemetryConfig::validate()`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `connect_timeout` is zero.
    ZeroConnectTimeout,
    /// `reconnect_interval` is zero.
    ZeroReconnectInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroConnectTimeout => write!(f, "connect_timeout must be non-zero"),
            Self::ZeroReconnectInterval => write!(f, "reconnect_interval must be non-zero"),
        }
    }
}

impl Error for ConfigError {}

// ── TelemetryConfig ────────────────────────────────────────────────

/// Where to send telemetry and how hard to try.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Consumer address. Default: `127.0.0.1:5555`.
    pub addr: SocketAddr,
    /// Upper bound on a single connect attempt. Default: 500 ms.
    pub connect_timeout: Duration,
    /// How often the reconnector checks for a lost connection.
    /// Default: 1 s.
    pub reconnect_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            connect_timeout: Duration::from_millis(500),
            reconnect_interval: Duration::from_secs(1),
        }
    }
}

impl TelemetryConfig {
    /// Default settings pointed at `addr`.
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // TcpStream::connect_timeout rejects a zero timeout.
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroConnectTimeout);
        }
        if self.reconnect_interval.is_zero() {
            return Err(ConfigError::ZeroReconnectInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_local_consumer() {
        let c = TelemetryConfig::default();
        assert_eq!(c.addr.to_string(), "127.0.0.1:5555");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_zero_durations() {
        let c = TelemetryConfig {
            connect_timeout: Duration::ZERO,
            ..TelemetryConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroConnectTimeout));

        let c = TelemetryConfig {
            reconnect_interval: Duration::ZERO,
            ..TelemetryConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroReconnectInterval));
    }
}
