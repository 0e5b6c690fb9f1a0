//! Per-device scan gating.
//!
//! A turnstile camera decodes the same code many times per second. The gate
//! admits a single in-flight redemption per device and suppresses further
//! decodes until the call resolves (or a timeout steals the slot) and a short
//! display cooldown elapses, mirroring the reader showing its decision before
//! accepting the next rider.

use std::sync::Mutex;

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::config::ScannerConfig;
use crate::metrics;

use super::{RedemptionCoordinator, RedemptionResult};

/// Outcome of feeding one decoded frame through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The gate admitted the scan and the coordinator decided it.
    Decided(RedemptionResult),
    /// Dropped: another redemption is in flight or the cooldown is running.
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
enum GateState {
    Idle,
    InFlight { since: Instant, token: u64 },
    CoolingDown { until: Instant },
}

struct Gate {
    state: GateState,
    next_token: u64,
}

/// A turnstile device: a redemption coordinator behind a per-device gate.
pub struct TurnstileScanner {
    coordinator: RedemptionCoordinator,
    identity: String,
    in_flight_timeout: Duration,
    cooldown: Duration,
    gate: Mutex<Gate>,
}

impl TurnstileScanner {
    /// Create a scanner for the device identified by `identity`.
    pub fn new(
        coordinator: RedemptionCoordinator,
        identity: impl Into<String>,
        config: &ScannerConfig,
    ) -> Self {
        Self {
            coordinator,
            identity: identity.into(),
            in_flight_timeout: Duration::from_secs(config.in_flight_timeout_secs),
            cooldown: Duration::from_secs(config.cooldown_secs),
            gate: Mutex::new(Gate {
                state: GateState::Idle,
                next_token: 0,
            }),
        }
    }

    /// Feed one decoded QR payload through the gate.
    ///
    /// At most one store operation is in flight per device; a burst of frames
    /// decoding the same code produces exactly one redemption call.
    pub async fn submit(&self, decoded: &str) -> ScanOutcome {
        let Some(token) = self.try_acquire() else {
            metrics::SCANS_SUPPRESSED.inc();
            debug!(scanner = %self.identity, "frame suppressed by gate");
            return ScanOutcome::Suppressed;
        };

        let result = self.coordinator.redeem(decoded, &self.identity).await;
        self.release(token);
        ScanOutcome::Decided(result)
    }

    fn try_acquire(&self) -> Option<u64> {
        let mut gate = self.gate.lock().unwrap();
        let now = Instant::now();

        match gate.state {
            GateState::Idle => {}
            GateState::InFlight { since, .. } => {
                // The slot can be stolen once the in-flight call overstays.
                if now.duration_since(since) < self.in_flight_timeout {
                    return None;
                }
            }
            GateState::CoolingDown { until } => {
                if now < until {
                    return None;
                }
            }
        }

        let token = gate.next_token;
        gate.next_token += 1;
        gate.state = GateState::InFlight { since: now, token };
        Some(token)
    }

    fn release(&self, token: u64) {
        let mut gate = self.gate.lock().unwrap();
        // A timed-out call may resolve after its slot was stolen; only the
        // current holder starts the cooldown.
        if let GateState::InFlight { token: current, .. } = gate.state {
            if current == token {
                gate.state = GateState::CoolingDown {
                    until: Instant::now() + self.cooldown,
                };
            }
        }
    }
}
