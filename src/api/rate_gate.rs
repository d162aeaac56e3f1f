// ============================================================================
// RateGate : porte de rate limiting (leaky bucket de taille 1)
// ============================================================================
// Garantit un intervalle minimum entre deux appels au endpoint batch.
// - Pas de file d'attente, pas d'équité : un seul appelant (la tâche de
//   rafraîchissement)
// - Si l'appel arrive trop tôt, on attend le temps restant via la Clock
// - L'instant enregistré est pris APRÈS l'attente
// ============================================================================

use std::time::{Duration, Instant};

use tracing::debug;

use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct RateGate {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Temps restant avant que la porte s'ouvre à l'instant `now`
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_call {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Attend si nécessaire, puis enregistre l'appel
    pub async fn acquire<C: Clock>(&mut self, clock: &C) {
        let wait = self.remaining(clock.now());
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "Rate gate closed, waiting");
            clock.sleep(wait).await;
        }
        self.last_call = Some(clock.now());
    }

    pub fn last_call(&self) -> Option<Instant> {
        self.last_call
    }
}
