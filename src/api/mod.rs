// ============================================================================
// Module : api
// ============================================================================
// Clients HTTP (CoinGecko, open.er-api.com), porte de rate limiting et
// traits de source de données.
//
// Les traits MarketSource / FxSource séparent la logique de rafraîchissement
// du réseau : les tests injectent des sources en mémoire.
// ============================================================================

pub mod coingecko; // Client CoinGecko (markets + market_chart)
pub mod error;     // FetchError
pub mod fx;        // Client du service de change
pub mod rate_gate; // Intervalle minimum entre deux appels batch

pub use coingecko::{CoinGeckoClient, MarketEntry};
pub use error::FetchError;
pub use fx::ExchangeRateClient;
pub use rate_gate::RateGate;

/// Source des données de marché (batch + historique par instrument)
#[allow(async_fn_in_trait)]
pub trait MarketSource {
    /// Métriques courantes pour tous les `ids`, en un seul appel
    async fn markets(&self, ids: &[String]) -> Result<Vec<MarketEntry>, FetchError>;

    /// Historique de prix d'un instrument, du plus ancien au plus récent
    async fn history(&self, id: &str) -> Result<Vec<f64>, FetchError>;
}

/// Source du taux EUR→USD
#[allow(async_fn_in_trait)]
pub trait FxSource {
    async fn eur_usd(&self) -> Result<f64, FetchError>;
}
