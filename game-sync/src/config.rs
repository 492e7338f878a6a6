use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Length of one countdown step
    pub tick_interval: Duration,
    /// Pause between a turn reaching zero and the timeout being applied
    pub turn_grace: Duration,
    pub role_poll_interval: Duration,
    pub role_poll_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            turn_grace: Duration::from_millis(1500),
            role_poll_interval: Duration::from_millis(500),
            role_poll_attempts: 10,
        }
    }
}
