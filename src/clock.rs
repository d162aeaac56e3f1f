// ============================================================================
// Clock : source de temps injectable
// ============================================================================
// La porte de rate limiting et la cadence EUR/USD lisent l'heure et dorment
// uniquement à travers ce trait.
// - TokioClock : horloge réelle (tokio::time)
// - ManualClock (tests) : sleep() avance l'horloge instantanément
// ============================================================================

use std::time::{Duration, Instant};

/// Source de temps monotone
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Instant courant
    fn now(&self) -> Instant;

    /// Suspend la tâche courante pendant `duration`
    async fn sleep(&self, duration: Duration);
}

/// Horloge basée sur tokio::time
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::Clock;

    #[derive(Debug)]
    struct State {
        now: Instant,
        sleeps: Vec<Duration>,
    }

    /// Horloge de test : le temps n'avance que via sleep() ou advance()
    ///
    /// Les clones partagent le même état, ce qui permet au test de garder
    /// une poignée pendant que le service possède l'autre.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        state: Arc<Mutex<State>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    now: Instant::now(),
                    sleeps: Vec::new(),
                })),
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.state.lock().unwrap().now += duration;
        }

        /// Durées demandées à sleep(), dans l'ordre
        pub fn sleeps(&self) -> Vec<Duration> {
            self.state.lock().unwrap().sleeps.clone()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.state.lock().unwrap().now
        }

        async fn sleep(&self, duration: Duration) {
            let mut state = self.state.lock().unwrap();
            state.sleeps.push(duration);
            state.now += duration;
        }
    }
}
