// ============================================================================
// API Client : CoinGecko
// ============================================================================
// Deux endpoints :
// - /coins/markets : prix, volume, variations 24h/7d pour tous les ids (batch)
// - /coins/{id}/market_chart : historique de prix sur N jours (un par id)
//
// Le corps de la réponse est lu en texte puis parsé avec serde_json, pour
// qu'un JSON invalide devienne FetchError::Malformed et pas une erreur de
// transport.
// ============================================================================

use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::api::error::{status_error, FetchError};
use crate::api::MarketSource;
use crate::config::Config;

/// User-Agent envoyé à toutes les APIs
pub const USER_AGENT: &str = concat!("cryptowidget/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Structures JSON
// ============================================================================

/// Une ligne de la réponse /coins/markets
///
/// Les champs de variation peuvent être absents ou null selon l'instrument.
#[derive(Debug, Deserialize)]
struct MarketRow {
    id: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    total_volume: Option<f64>,
}

/// Réponse /coins/{id}/market_chart : [[timestamp_ms, prix], ...]
#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

/// Métriques courantes d'un instrument, telles que renvoyées par le batch
#[derive(Debug, Clone, PartialEq)]
pub struct MarketEntry {
    pub id: String,
    pub price: f64,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub volume: Option<f64>,
}

// ============================================================================
// Client
// ============================================================================

/// Client HTTP CoinGecko
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    vs_currency: String,
    history_days: u32,
}

impl CoinGeckoClient {
    /// Crée le client avec le timeout et l'URL de la configuration
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.market_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.market_base_url.clone(),
            vs_currency: config.vs_currency.clone(),
            history_days: config.history_days,
        })
    }

    fn markets_url(&self, ids: &[String]) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&ids={}&price_change_percentage=24h,7d",
            self.base_url,
            self.vs_currency,
            ids.join(",")
        )
    }

    fn history_url(&self, id: &str) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}",
            self.base_url, id, self.vs_currency, self.history_days
        )
    }

    /// GET + vérification du statut + lecture du corps
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = %url, "Sending HTTP request to CoinGecko");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if status != reqwest::StatusCode::OK {
            error!(status = %status, "CoinGecko returned error status");
            return Err(status_error(status));
        }

        Ok(response.text().await?)
    }
}

impl MarketSource for CoinGeckoClient {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn markets(&self, ids: &[String]) -> Result<Vec<MarketEntry>, FetchError> {
        let body = self.get_text(&self.markets_url(ids)).await?;
        let entries = parse_markets(&body)?;
        info!(entries = entries.len(), "Fetched market metrics");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn history(&self, id: &str) -> Result<Vec<f64>, FetchError> {
        let body = self.get_text(&self.history_url(id)).await?;
        let prices = parse_history(&body)?;
        debug!(samples = prices.len(), "Fetched price history");
        Ok(prices)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse la réponse /coins/markets
///
/// Une entrée sans prix courant est ignorée (avec un warning) plutôt que de
/// faire échouer tout le batch.
pub fn parse_markets(body: &str) -> Result<Vec<MarketEntry>, FetchError> {
    let rows: Vec<MarketRow> = serde_json::from_str(body)?;

    let entries = rows
        .into_iter()
        .filter_map(|row| match row.current_price {
            Some(price) => Some(MarketEntry {
                id: row.id,
                price,
                change_24h: row.price_change_percentage_24h,
                change_7d: row.price_change_percentage_7d_in_currency,
                volume: row.total_volume,
            }),
            None => {
                warn!(id = %row.id, "Skipping market entry without current price");
                None
            }
        })
        .collect();

    Ok(entries)
}

/// Parse la réponse /market_chart et garde uniquement la colonne prix
///
/// Une série vide est traitée comme une réponse invalide.
pub fn parse_history(body: &str) -> Result<Vec<f64>, FetchError> {
    let chart: MarketChart = serde_json::from_str(body)?;

    if chart.prices.is_empty() {
        return Err(FetchError::Malformed("empty price history".to_string()));
    }

    Ok(chart.prices.into_iter().map(|(_, price)| price).collect())
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CoinGeckoClient {
        CoinGeckoClient::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_markets_url() {
        let ids = vec!["bitcoin".to_string(), "ethereum".to_string()];
        let url = client().markets_url(&ids);

        assert!(url.starts_with("https://api.coingecko.com/api/v3/coins/markets?"));
        assert!(url.contains("vs_currency=usd"));
        assert!(url.contains("ids=bitcoin,ethereum"));
        assert!(url.contains("price_change_percentage=24h,7d"));
    }

    #[test]
    fn test_history_url() {
        let url = client().history_url("solana");
        assert!(url.ends_with("/coins/solana/market_chart?vs_currency=usd&days=7"));
    }

    #[test]
    fn test_parse_markets() {
        let body = r#"[
            {"id": "bitcoin", "current_price": 65000.5, "price_change_percentage_24h": 1.25,
             "price_change_percentage_7d_in_currency": -3.5, "total_volume": 32000000000},
            {"id": "dogecoin", "current_price": 0.12, "price_change_percentage_24h": null,
             "total_volume": 900000000},
            {"id": "broken", "current_price": null}
        ]"#;

        let entries = parse_markets(body).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "bitcoin");
        assert_eq!(entries[0].price, 65000.5);
        assert_eq!(entries[0].change_7d, Some(-3.5));
        assert_eq!(entries[1].change_24h, None);
        assert_eq!(entries[1].change_7d, None);
        assert_eq!(entries[1].volume, Some(900000000.0));
    }

    #[test]
    fn test_parse_markets_malformed() {
        let err = parse_markets(r#"{"status": "oops"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn test_parse_history() {
        let body = r#"{"prices": [[1700000000000, 10.0], [1700003600000, 11.5]],
                       "market_caps": [], "total_volumes": []}"#;
        assert_eq!(parse_history(body).unwrap(), vec![10.0, 11.5]);
    }

    #[test]
    fn test_parse_history_empty_is_error() {
        let err = parse_history(r#"{"error": "coin not found"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }
}
