//! Bounded exponential backoff with jitter around text recognition.
//!
//! Only transient failures (timeouts, quota, service outages) are retried;
//! anything else is returned straight away.

use std::{thread, time::Duration};

use rand::Rng;

use crate::OcrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, doubled on every following one.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential delay for the given retry, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay)
    }

    /// `backoff` plus up to one base delay of random jitter, still capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let jitter = if base_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
        } else {
            Duration::ZERO
        };
        (self.backoff(attempt) + jitter).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently or runs out of
    /// retries.
    pub fn run<T>(
        &self,
        mut operation: impl FnMut() -> Result<T, OcrError>,
    ) -> Result<T, OcrError> {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay(attempt);
                    log::warn!(
                        "Transient text recognition failure ({err}), retry {} of {} in {delay:?}",
                        attempt + 1,
                        self.max_retries
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        log::warn!("Giving up after {} retries: {err}", self.max_retries);
                    }
                    return Err(err);
                }
            }
        }
    }
}
