use std::time::Duration;

/// Connection settings for the SQLite ledger store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Pool size for file-backed databases
    pub max_connections: u32,

    /// How long a writer waits for the database lock before failing
    pub busy_timeout: Duration,

    /// Upper bound on waiting for a pooled connection
    pub query_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    pub fn new(max_connections: u32, busy_timeout_ms: u64) -> Self {
        Self {
            max_connections: max_connections.max(1),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_never_zero() {
        let config = StoreConfig::new(0, 250);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.query_timeout, StoreConfig::default().query_timeout);
    }
}
