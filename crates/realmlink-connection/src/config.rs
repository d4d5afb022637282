use std::time::Duration;

/// Default number of buffered error events per subscriber.
pub const DEFAULT_ERROR_CAPACITY: usize = 64;

/// Configuration for a realm connection.
///
/// Both timeouts are off by default: the handshake waits until the remote
/// realm answers and a call waits until its return arrives or the
/// connection closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Bound on waiting for the remote exports.
    pub handshake_timeout: Option<Duration>,
    /// Bound on waiting for each call's return.
    pub call_timeout: Option<Duration>,
    /// Error events buffered per subscriber before the oldest are dropped.
    pub error_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: None,
            call_timeout: None,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever() {
        let config = ConnectionConfig::default();
        assert_eq!(config.handshake_timeout, None);
        assert_eq!(config.call_timeout, None);
        assert_eq!(config.error_capacity, DEFAULT_ERROR_CAPACITY);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let config = ConnectionConfig::default().with_error_capacity(0);
        assert_eq!(config.error_capacity, 1);
    }
}
