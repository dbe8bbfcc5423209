use std::time::Duration;

use crate::error::PipelineError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1_000);

/// Bounded retry for status polling: a fixed number of checks, a fixed
/// pause between them and an optional wall-clock cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
    timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn new(
        max_attempts: u32,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<Self, PipelineError> {
        if max_attempts == 0 {
            return Err(PipelineError::InvalidPollAttempts);
        }
        Ok(Self {
            max_attempts,
            interval,
            timeout,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether another check may follow `attempts_made` checks, given the
    /// time already spent and the pause that would precede it.
    pub fn allows_another_attempt(&self, attempts_made: u32, elapsed: Duration) -> bool {
        if attempts_made >= self.max_attempts {
            return false;
        }
        match self.timeout {
            Some(timeout) => elapsed.saturating_add(self.interval) <= timeout,
            None => true,
        }
    }
}
