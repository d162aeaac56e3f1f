// ============================================================================
// Configuration
// ============================================================================
// Constantes de l'application regroupées dans une seule structure
//
// Les valeurs par défaut reprennent les cadences du widget d'origine :
// - rafraîchissement toutes les 60s
// - au moins 10s entre deux appels au endpoint "markets"
// - 2s de courtoisie avant chaque appel d'historique
// - taux EUR/USD rafraîchi toutes les 5 minutes
//
// Seuls les timeouts HTTP et les URLs de base sont surchargeables par
// variables d'environnement.
// ============================================================================

use std::time::Duration;

use tracing::warn;

/// Paire dérivée : ratio du prix de `numerator` sur celui de `denominator`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSpec {
    /// Clé de la paire directe (ex: "eth_btc")
    pub forward_key: String,
    /// Clé de la paire inverse (ex: "btc_eth")
    pub inverse_key: String,
    /// Instrument au numérateur de la paire directe (ex: "ethereum")
    pub numerator: String,
    /// Instrument au dénominateur de la paire directe (ex: "bitcoin")
    pub denominator: String,
}

/// Configuration complète de l'application
#[derive(Debug, Clone)]
pub struct Config {
    /// Période de la boucle de rafraîchissement
    pub poll_period: Duration,

    /// Intervalle minimum entre deux appels au endpoint batch
    pub market_min_interval: Duration,

    /// Délai fixe avant chaque appel d'historique
    pub history_delay: Duration,

    /// Intervalle minimum entre deux appels au service de change
    pub fx_refresh_interval: Duration,

    pub market_timeout: Duration,
    pub fx_timeout: Duration,

    /// URL de base CoinGecko (sans slash final)
    pub market_base_url: String,

    /// URL de base open.er-api.com (sans slash final)
    pub fx_base_url: String,

    /// Devise de cotation des instruments
    pub vs_currency: String,

    /// Nombre de jours d'historique demandés
    pub history_days: u32,

    /// Longueur de la série "à plat" quand l'historique est indisponible
    pub flat_fill_len: usize,

    /// Instruments suivis, dans l'ordre d'affichage
    pub coins: Vec<String>,

    pub pairs: Vec<PairSpec>,

    /// Clé de la ligne EUR/USD
    pub fx_key: String,

    /// Taille (colonnes, lignes) des images de graphique
    pub image_size: (u16, u16),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(60),
            market_min_interval: Duration::from_secs(10),
            history_delay: Duration::from_secs(2),
            fx_refresh_interval: Duration::from_secs(300),
            market_timeout: Duration::from_secs(15),
            fx_timeout: Duration::from_secs(10),
            market_base_url: "https://api.coingecko.com/api/v3".to_string(),
            fx_base_url: "https://open.er-api.com".to_string(),
            vs_currency: "usd".to_string(),
            history_days: 7,
            flat_fill_len: 7,
            coins: [
                "bitcoin",
                "ethereum",
                "solana",
                "dogecoin",
                "ripple",
                "binancecoin",
                "litecoin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            pairs: vec![PairSpec {
                forward_key: "eth_btc".to_string(),
                inverse_key: "btc_eth".to_string(),
                numerator: "ethereum".to_string(),
                denominator: "bitcoin".to_string(),
            }],
            fx_key: "eur_usd".to_string(),
            image_size: (72, 22),
        }
    }
}

impl Config {
    /// Configuration par défaut, surchargée par l'environnement
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applique les surcharges fournies par `lookup`
    ///
    /// CONCEPT RUST : injection d'une closure
    /// - from_env() passe std::env::var
    /// - les tests passent une table en mémoire
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secs) = parse_secs(&lookup, "CRYPTOWIDGET_MARKET_TIMEOUT_SECS") {
            self.market_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs(&lookup, "CRYPTOWIDGET_FX_TIMEOUT_SECS") {
            self.fx_timeout = Duration::from_secs(secs);
        }
        if let Some(url) = lookup("CRYPTOWIDGET_MARKET_URL") {
            self.market_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("CRYPTOWIDGET_FX_URL") {
            self.fx_base_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Clés de toutes les lignes du tableau, dans l'ordre d'affichage
    pub fn row_keys(&self) -> Vec<String> {
        let mut keys = self.coins.clone();
        for pair in &self.pairs {
            keys.push(pair.forward_key.clone());
            keys.push(pair.inverse_key.clone());
        }
        keys.push(self.fx_key.clone());
        keys
    }
}

fn parse_secs<F>(lookup: &F, name: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(secs),
        _ => {
            warn!(variable = name, value = %raw, "Ignoring invalid timeout override");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
