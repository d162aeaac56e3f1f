// ============================================================================
// Erreurs des appels API
// ============================================================================
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère Display + std::error::Error
// - #[from] permet la conversion automatique avec ?
//
// Taxonomie :
// - Transport : réseau, timeout (reqwest)
// - RateLimited : HTTP 429, distingué des autres statuts
// - Status : tout autre statut non-200
// - Malformed : JSON incomplet ou inattendu
// - FxUnavailable : le service de change n'a pas retourné de taux USD
// ============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no FX data available")]
    FxUnavailable,
}

impl FetchError {
    /// Vrai pour un HTTP 429
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited)
    }

    /// Message affiché dans la ligne de statut quand le batch échoue
    pub fn status_message(&self) -> String {
        match self {
            FetchError::RateLimited => "Rate limited - waiting for next cycle".to_string(),
            FetchError::Status(code) => format!("API Error: {}", code),
            FetchError::Transport(e) => format!("API Error: {}", e),
            FetchError::Malformed(detail) => format!("API Error: {}", detail),
            FetchError::FxUnavailable => "No FX data available".to_string(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Malformed(e.to_string())
    }
}

/// Convertit un statut HTTP non-200 en erreur
///
/// 429 est séparé pour que l'UI affiche un message différent.
pub fn status_error(status: reqwest::StatusCode) -> FetchError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        FetchError::RateLimited
    } else {
        FetchError::Status(status.as_u16())
    }
}
