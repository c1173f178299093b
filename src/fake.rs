//! Simulated backend behavior shared by the fake transport and fake users service

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("simulated request failure")]
pub struct SimulatedFailure;

/// Latency and random failure injection for in-process fakes.
#[derive(Debug, Clone, Default)]
pub struct FakeBehavior {
    pub latency: Duration,
    /// Chance in `[0, 1]` that a request fails
    pub error_probability: f64,
}

impl FakeBehavior {
    pub fn new(latency: Duration, error_probability: f64) -> Self {
        Self {
            latency,
            error_probability: error_probability.clamp(0.0, 1.0),
        }
    }

    /// Wait for the configured latency, then either fail or produce `respond()`.
    pub async fn simulate<T>(&self, respond: impl FnOnce() -> T) -> Result<T, SimulatedFailure> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.should_fail() {
            tracing::debug!("Fake backend injecting failure");
            return Err(SimulatedFailure);
        }
        Ok(respond())
    }

    fn should_fail(&self) -> bool {
        if self.error_probability <= 0.0 {
            return false;
        }
        if self.error_probability >= 1.0 {
            return true;
        }
        let mut buf = [0u8; 4];
        if getrandom::getrandom(&mut buf).is_err() {
            return false;
        }
        let roll = u32::from_le_bytes(buf) as f64 / u32::MAX as f64;
        roll < self.error_probability
    }
}
