// ============================================================================
// Rafraîchissement des données
// ============================================================================
// Un cycle = fetch batch → historiques → paires dérivées → taux de change.
// Le rendu (images, fenêtres) est fait ensuite par le thread UI à partir du
// CycleReport.
//
// CONCEPTS :
// 1. Échec du batch : le cycle est abandonné, aucune ligne n'est modifiée
// 2. Échec d'un historique : isolé, remplacé par une série à plat
// 3. Taux de change : cadence propre, plus longue que la boucle principale
// 4. Boucle : un thread dédié avec son runtime tokio (comme le worker
//    thread de l'UI), arrêtable via RefreshHandle
// ============================================================================

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{FetchError, FxSource, MarketSource, RateGate};
use crate::clock::Clock;
use crate::config::{Config, PairSpec};
use crate::models::{derive_pair, flat_series, FxQuote, Instrument, StatusLine};

// ============================================================================
// Fetch des données de marché
// ============================================================================

/// Récupère les métriques de tous les `ids` puis leur historique
///
/// Ordre observable :
/// 1. porte de rate limiting, puis UN appel batch
/// 2. pour chaque instrument reçu : délai fixe, puis appel d'historique
///
/// Retourne Err si le batch échoue (429, autre statut, réseau, JSON).
#[instrument(skip_all, fields(ids = ids.len()))]
pub async fn fetch_market_data<M, C>(
    source: &M,
    gate: &mut RateGate,
    clock: &C,
    ids: &[String],
    history_delay: Duration,
    flat_fill_len: usize,
) -> Result<HashMap<String, Instrument>, FetchError>
where
    M: MarketSource,
    C: Clock,
{
    gate.acquire(clock).await;
    let entries = source.markets(ids).await?;

    let mut instruments = HashMap::with_capacity(entries.len() + 2);
    for entry in entries {
        clock.sleep(history_delay).await;

        let history = match source.history(&entry.id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(id = %entry.id, error = %e, "History fetch failed, using flat series");
                flat_series(entry.price, flat_fill_len)
            }
        };

        let instrument = Instrument::from_market(entry, history);
        instruments.insert(instrument.key.clone(), instrument);
    }

    Ok(instruments)
}

/// Ajoute les paires dérivées dont les deux instruments sont présents
pub fn add_derived_pairs(instruments: &mut HashMap<String, Instrument>, pairs: &[PairSpec]) {
    for pair in pairs {
        let derived = match (
            instruments.get(&pair.numerator),
            instruments.get(&pair.denominator),
        ) {
            (Some(num), Some(den)) => {
                derive_pair(&pair.forward_key, &pair.inverse_key, num, den)
            }
            _ => {
                debug!(pair = %pair.forward_key, "Pair sources missing this cycle");
                continue;
            }
        };

        match derived {
            Some(derived) => {
                instruments.insert(derived.forward.key.clone(), derived.forward);
                instruments.insert(derived.inverse.key.clone(), derived.inverse);
            }
            None => warn!(pair = %pair.forward_key, "Zero or invalid price, pair skipped"),
        }
    }
}

// ============================================================================
// Taux de change
// ============================================================================

/// Suit le dernier appel au service de change et le dernier taux connu
#[derive(Debug, Clone)]
pub struct FxTracker {
    key: String,
    min_interval: Duration,
    history_len: usize,
    last_fetch: Option<Instant>,
    quote: Option<FxQuote>,
}

impl FxTracker {
    pub fn new(key: String, min_interval: Duration, history_len: usize) -> Self {
        Self {
            key,
            min_interval,
            history_len,
            last_fetch: None,
            quote: None,
        }
    }

    /// Vrai si aucun appel n'a été fait ou si l'intervalle est écoulé
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_fetch {
            Some(last) => now.saturating_duration_since(last) > self.min_interval,
            None => true,
        }
    }

    /// Interroge le service ; en cas d'échec, le taux devient indéfini
    ///
    /// L'instant d'appel est enregistré même en cas d'échec : pas de
    /// nouvel essai avant la fin de l'intervalle.
    pub async fn refresh<F: FxSource>(&mut self, source: &F, now: Instant) -> Result<(), FetchError> {
        self.last_fetch = Some(now);

        match source.eur_usd().await {
            Ok(rate) => {
                info!(rate, "FX rate updated");
                self.quote = Some(FxQuote::new(self.key.clone(), rate, self.history_len));
                Ok(())
            }
            Err(e) => {
                self.quote = None;
                Err(e)
            }
        }
    }

    pub fn quote(&self) -> Option<&FxQuote> {
        self.quote.as_ref()
    }
}

fn fx_status(error: &FetchError) -> StatusLine {
    match error {
        FetchError::FxUnavailable => StatusLine::error("No FX data available"),
        other => StatusLine::error(format!("FX API error: {}", other)),
    }
}

// ============================================================================
// Cycle complet
// ============================================================================

/// Résultat d'un cycle, envoyé au thread UI
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Message pour la ligne de statut
    pub status: StatusLine,

    /// Instruments à afficher (vide si le batch a échoué)
    pub instruments: HashMap<String, Instrument>,
}

impl CycleReport {
    pub fn failed(status: StatusLine) -> Self {
        Self {
            status,
            instruments: HashMap::new(),
        }
    }
}

/// Service de rafraîchissement : possède les sources, l'horloge, la porte
/// et l'état du taux de change
pub struct RefreshService<M, F, C> {
    market: M,
    fx: F,
    clock: C,
    gate: RateGate,
    fx_tracker: FxTracker,
    config: Config,
}

impl<M, F, C> RefreshService<M, F, C>
where
    M: MarketSource,
    F: FxSource,
    C: Clock,
{
    pub fn new(market: M, fx: F, clock: C, config: Config) -> Self {
        let gate = RateGate::new(config.market_min_interval);
        let fx_tracker = FxTracker::new(
            config.fx_key.clone(),
            config.fx_refresh_interval,
            config.flat_fill_len,
        );

        Self {
            market,
            fx,
            clock,
            gate,
            fx_tracker,
            config,
        }
    }

    /// Exécute un cycle complet ; ne retourne jamais d'erreur
    pub async fn run_cycle(&mut self) -> CycleReport {
        let fetched = fetch_market_data(
            &self.market,
            &mut self.gate,
            &self.clock,
            &self.config.coins,
            self.config.history_delay,
            self.config.flat_fill_len,
        )
        .await;

        let mut instruments = match fetched {
            Ok(instruments) => instruments,
            Err(e) => {
                error!(error = %e, rate_limited = e.is_rate_limited(), "Market fetch failed, cycle aborted");
                return CycleReport::failed(StatusLine::error(e.status_message()));
            }
        };

        add_derived_pairs(&mut instruments, &self.config.pairs);

        let mut status = StatusLine::info(format!(
            "Last update: {}",
            Local::now().format("%H:%M:%S")
        ));

        let now = self.clock.now();
        if self.fx_tracker.is_due(now) {
            if let Err(e) = self.fx_tracker.refresh(&self.fx, now).await {
                error!(error = %e, "FX fetch failed");
                status = fx_status(&e);
            }
        }

        if let Some(quote) = self.fx_tracker.quote() {
            instruments.insert(quote.key.clone(), quote.to_instrument());
        }

        info!(instruments = instruments.len(), "Refresh cycle complete");
        CycleReport {
            status,
            instruments,
        }
    }
}

// ============================================================================
// Boucle périodique
// ============================================================================

/// Poignée de la boucle de rafraîchissement
///
/// Lâcher la poignée arrête aussi la boucle (le canal d'arrêt se ferme),
/// mais sans attendre la fin du thread.
pub struct RefreshHandle {
    stop_tx: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

impl RefreshHandle {
    /// Arrête la boucle et attend la fin du thread
    pub fn shutdown(self) {
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            error!("Refresh thread panicked");
        }
    }
}

/// Lance la boucle sur un thread dédié
///
/// Le premier cycle démarre immédiatement, puis un cycle par `period`.
/// Un cycle plus long que la période retarde le suivant
/// (MissedTickBehavior::Delay) : jamais deux cycles en parallèle.
pub fn spawn_refresh_loop<M, F, C>(
    service: RefreshService<M, F, C>,
    period: Duration,
    report_tx: mpsc::Sender<CycleReport>,
) -> Result<RefreshHandle>
where
    M: MarketSource + Send + 'static,
    F: FxSource + Send + 'static,
    C: Clock + Send + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel();

    let thread = std::thread::Builder::new()
        .name("refresh".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "Failed to create refresh runtime");
                    return;
                }
            };

            runtime.block_on(refresh_loop(service, period, report_tx, stop_rx));
            info!("Refresh thread exiting");
        })
        .context("Échec du lancement du thread de rafraîchissement")?;

    Ok(RefreshHandle { stop_tx, thread })
}

async fn refresh_loop<M, F, C>(
    mut service: RefreshService<M, F, C>,
    period: Duration,
    report_tx: mpsc::Sender<CycleReport>,
    mut stop_rx: oneshot::Receiver<()>,
) where
    M: MarketSource,
    F: FxSource,
    C: Clock,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        debug!("Starting refresh cycle");
        let report = tokio::select! {
            _ = &mut stop_rx => break,
            report = service.run_cycle() => report,
        };

        if report_tx.send(report).is_err() {
            info!("Report channel closed, stopping refresh loop");
            break;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::api::MarketEntry;
    use crate::clock::ManualClock;

    // ------------------------------------------------------------------------
    // Sources en mémoire
    // ------------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct FakeMarket {
        entries: Vec<MarketEntry>,
        histories: HashMap<String, Vec<f64>>,
        failing_history: HashSet<String>,
        batch_status: Option<u16>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeMarket {
        fn with_coins(coins: &[(&str, f64)]) -> Self {
            let mut market = FakeMarket::default();
            for &(id, price) in coins {
                market.entries.push(MarketEntry {
                    id: id.to_string(),
                    price,
                    change_24h: Some(1.5),
                    change_7d: Some(-2.0),
                    volume: Some(2e9),
                });
                let history = (0..168).map(|i| price * (0.9 + i as f64 / 1000.0)).collect();
                market.histories.insert(id.to_string(), history);
            }
            market
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MarketSource for FakeMarket {
        async fn markets(&self, _ids: &[String]) -> Result<Vec<MarketEntry>, FetchError> {
            self.calls.lock().unwrap().push("markets".to_string());
            match self.batch_status {
                Some(429) => Err(FetchError::RateLimited),
                Some(code) => Err(FetchError::Status(code)),
                None => Ok(self.entries.clone()),
            }
        }

        async fn history(&self, id: &str) -> Result<Vec<f64>, FetchError> {
            self.calls.lock().unwrap().push(format!("history:{}", id));
            if self.failing_history.contains(id) {
                return Err(FetchError::Status(500));
            }
            self.histories
                .get(id)
                .cloned()
                .ok_or_else(|| FetchError::Malformed("unknown id".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct FakeFx {
        rate: Option<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeFx {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FxSource for FakeFx {
        async fn eur_usd(&self) -> Result<f64, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate.ok_or(FetchError::FxUnavailable)
        }
    }

    fn test_config() -> Config {
        Config {
            coins: vec!["bitcoin".to_string(), "ethereum".to_string()],
            ..Config::default()
        }
    }

    fn btc_eth_market() -> FakeMarket {
        FakeMarket::with_coins(&[("bitcoin", 64000.0), ("ethereum", 3200.0)])
    }

    // ------------------------------------------------------------------------
    // Fetch
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_batch_before_serial_histories() {
        let market = btc_eth_market();
        let clock = ManualClock::new();
        let mut gate = RateGate::new(Duration::from_secs(10));
        let ids = test_config().coins;

        let instruments =
            fetch_market_data(&market, &mut gate, &clock, &ids, Duration::from_secs(2), 7)
                .await
                .unwrap();

        assert_eq!(
            market.calls(),
            vec!["markets", "history:bitcoin", "history:ethereum"]
        );
        // Premier passage de la porte sans attente, puis 2s avant chaque historique
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments["bitcoin"].history.len(), 168);
    }

    #[tokio::test]
    async fn test_history_failure_is_isolated() {
        let mut market = FakeMarket::with_coins(&[
            ("bitcoin", 64000.0),
            ("ethereum", 3200.0),
            ("solana", 150.0),
        ]);
        market.failing_history.insert("ethereum".to_string());
        let clock = ManualClock::new();
        let mut gate = RateGate::new(Duration::from_secs(10));
        let ids: Vec<String> = ["bitcoin", "ethereum", "solana"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let instruments =
            fetch_market_data(&market, &mut gate, &clock, &ids, Duration::from_secs(2), 7)
                .await
                .unwrap();

        assert_eq!(instruments.len(), 3);
        assert_eq!(instruments["ethereum"].history, vec![3200.0; 7]);
        assert_eq!(instruments["bitcoin"].history.len(), 168);
        assert_eq!(instruments["solana"].history.len(), 168);
        // L'échec n'interrompt pas la suite
        assert!(market.calls().contains(&"history:solana".to_string()));
    }

    #[tokio::test]
    async fn test_batch_failure_skips_histories() {
        let mut market = btc_eth_market();
        market.batch_status = Some(503);
        let clock = ManualClock::new();
        let mut gate = RateGate::new(Duration::from_secs(10));

        let result = fetch_market_data(
            &market,
            &mut gate,
            &clock,
            &test_config().coins,
            Duration::from_secs(2),
            7,
        )
        .await;

        assert!(matches!(result, Err(FetchError::Status(503))));
        assert_eq!(market.calls(), vec!["markets"]);
    }

    #[test]
    fn test_add_derived_pairs() {
        let mut instruments = HashMap::new();
        instruments.insert(
            "ethereum".to_string(),
            Instrument::ratio("ethereum".to_string(), 3000.0, vec![3000.0; 5]),
        );
        instruments.insert(
            "bitcoin".to_string(),
            Instrument::ratio("bitcoin".to_string(), 60000.0, vec![60000.0; 3]),
        );

        add_derived_pairs(&mut instruments, &Config::default().pairs);

        assert_eq!(instruments["eth_btc"].price, 0.05);
        assert_eq!(instruments["btc_eth"].price, 20.0);
        assert_eq!(instruments["eth_btc"].history.len(), 3);
    }

    #[test]
    fn test_pairs_need_both_sources() {
        let mut instruments = HashMap::new();
        instruments.insert(
            "bitcoin".to_string(),
            Instrument::ratio("bitcoin".to_string(), 60000.0, vec![60000.0; 3]),
        );

        add_derived_pairs(&mut instruments, &Config::default().pairs);

        assert_eq!(instruments.len(), 1);
    }

    // ------------------------------------------------------------------------
    // Cycle complet
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cycle_success() {
        let fx = FakeFx {
            rate: Some(1.08),
            ..Default::default()
        };
        let mut service =
            RefreshService::new(btc_eth_market(), fx, ManualClock::new(), test_config());

        let report = service.run_cycle().await;

        assert!(!report.status.is_error());
        assert!(report.status.text.starts_with("Last update: "));
        for key in ["bitcoin", "ethereum", "eth_btc", "btc_eth", "eur_usd"] {
            assert!(report.instruments.contains_key(key), "missing {}", key);
        }
        assert_eq!(report.instruments["eur_usd"].history, vec![1.08; 7]);
    }

    #[tokio::test]
    async fn test_rate_limited_cycle_returns_nothing() {
        let mut market = btc_eth_market();
        market.batch_status = Some(429);
        let fx = FakeFx {
            rate: Some(1.08),
            ..Default::default()
        };
        let mut service = RefreshService::new(market, fx.clone(), ManualClock::new(), test_config());

        let report = service.run_cycle().await;

        assert!(report.instruments.is_empty());
        assert!(report.status.is_error());
        assert_eq!(report.status.text, "Rate limited - waiting for next cycle");
        // Pas d'appel au service de change dans un cycle avorté
        assert_eq!(fx.calls(), 0);
    }

    #[tokio::test]
    async fn test_generic_failure_status_differs_from_rate_limit() {
        let mut market = btc_eth_market();
        market.batch_status = Some(500);
        let mut service =
            RefreshService::new(market, FakeFx::default(), ManualClock::new(), test_config());

        let report = service.run_cycle().await;

        assert!(report.instruments.is_empty());
        assert_eq!(report.status.text, "API Error: 500");
    }

    #[tokio::test]
    async fn test_consecutive_cycles_respect_gate() {
        let clock = ManualClock::new();
        let mut service = RefreshService::new(
            btc_eth_market(),
            FakeFx::default(),
            clock.clone(),
            test_config(),
        );

        service.run_cycle().await;
        service.run_cycle().await;

        // Cycle 1 : 2s + 2s ; cycle 2 : la porte attend les 6s restantes
        assert_eq!(
            clock.sleeps(),
            vec![
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(6),
                Duration::from_secs(2),
                Duration::from_secs(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_fx_not_refetched_within_interval() {
        let clock = ManualClock::new();
        let fx = FakeFx {
            rate: Some(1.1),
            ..Default::default()
        };
        let mut service =
            RefreshService::new(btc_eth_market(), fx.clone(), clock.clone(), test_config());

        let first = service.run_cycle().await;
        assert_eq!(fx.calls(), 1);
        assert!(first.instruments.contains_key("eur_usd"));

        for _ in 0..3 {
            clock.advance(Duration::from_secs(60));
            let report = service.run_cycle().await;
            // Taux en cache toujours affiché
            assert!(report.instruments.contains_key("eur_usd"));
        }
        assert_eq!(fx.calls(), 1);

        clock.advance(Duration::from_secs(300));
        service.run_cycle().await;
        assert_eq!(fx.calls(), 2);
    }

    #[tokio::test]
    async fn test_fx_failure_leaves_quote_unset() {
        let mut service = RefreshService::new(
            btc_eth_market(),
            FakeFx::default(),
            ManualClock::new(),
            test_config(),
        );

        let report = service.run_cycle().await;

        assert!(report.status.is_error());
        assert_eq!(report.status.text, "No FX data available");
        assert!(!report.instruments.contains_key("eur_usd"));
        // Les données de marché sont tout de même livrées
        assert!(report.instruments.contains_key("bitcoin"));
    }

    #[test]
    fn test_fx_tracker_due() {
        let tracker = FxTracker::new("eur_usd".to_string(), Duration::from_secs(300), 7);
        let now = Instant::now();
        assert!(tracker.is_due(now));

        let mut tracker = tracker;
        tracker.last_fetch = Some(now);
        assert!(!tracker.is_due(now + Duration::from_secs(300)));
        assert!(tracker.is_due(now + Duration::from_secs(301)));
    }

    // ------------------------------------------------------------------------
    // Boucle
    // ------------------------------------------------------------------------

    #[test]
    fn test_refresh_loop_delivers_reports_and_stops() {
        let service = RefreshService::new(
            btc_eth_market(),
            FakeFx {
                rate: Some(1.08),
                ..Default::default()
            },
            ManualClock::new(),
            test_config(),
        );
        let (tx, rx) = mpsc::channel();

        let handle = spawn_refresh_loop(service, Duration::from_millis(20), tx).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.instruments.contains_key("bitcoin"));
        assert!(second.instruments.contains_key("eur_usd"));

        handle.shutdown();
        // Après l'arrêt, l'émetteur est lâché : le canal finit par se fermer
        while rx.recv_timeout(Duration::from_secs(5)).is_ok() {}
    }
}
