// ============================================================================
// API Client : taux de change (open.er-api.com)
// ============================================================================
// Un seul appel : /v6/latest/EUR, dont on garde le taux USD.
// Le service n'a pas d'endpoint d'historique.
// ============================================================================

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, error, instrument};

use crate::api::coingecko::USER_AGENT;
use crate::api::error::{status_error, FetchError};
use crate::api::FxSource;
use crate::config::Config;

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// Client HTTP du service de change
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExchangeRateClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.fx_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.fx_base_url.clone(),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}/v6/latest/EUR", self.base_url)
    }
}

impl FxSource for ExchangeRateClient {
    #[instrument(skip(self))]
    async fn eur_usd(&self) -> Result<f64, FetchError> {
        let url = self.latest_url();
        debug!(url = %url, "Requesting latest EUR rates");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "FX service returned error status");
            return Err(status_error(status));
        }

        let body = response.text().await?;
        parse_eur_usd(&body)
    }
}

/// Extrait le taux EUR→USD d'une réponse /v6/latest/EUR
pub fn parse_eur_usd(body: &str) -> Result<f64, FetchError> {
    let latest: LatestRates = serde_json::from_str(body)?;

    if latest.result.as_deref() != Some("success") {
        return Err(FetchError::FxUnavailable);
    }

    match latest.rates.get("USD") {
        Some(&rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
        _ => Err(FetchError::FxUnavailable),
    }
}
