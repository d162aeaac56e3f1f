// ============================================================================
// Structure : Instrument
// ============================================================================
// Un actif coté (crypto, paire dérivée ou taux de change) tel que reconstruit
// à chaque cycle de rafraîchissement.
//
// CONCEPTS RUST :
// 1. Option<f64> : les variations n'existent pas pour les paires dérivées
// 2. Vec<f64> : historique ordonné du plus ancien au plus récent
// ============================================================================

use crate::api::MarketEntry;

/// Instrument suivi, reconstruit à chaque cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Clé de l'instrument (ex: "bitcoin", "eth_btc", "eur_usd")
    pub key: String,

    /// Prix courant
    pub price: f64,

    /// Variation sur 24h en pourcentage (None pour les ratios)
    pub change_24h: Option<f64>,

    /// Variation sur 7 jours en pourcentage (None pour les ratios)
    pub change_7d: Option<f64>,

    /// Volume sur 24h dans la devise de cotation
    pub volume: Option<f64>,

    /// Historique des prix, du plus ancien au plus récent
    pub history: Vec<f64>,
}

impl Instrument {
    /// Crée un instrument à partir des métriques du batch et d'un historique
    pub fn from_market(entry: MarketEntry, history: Vec<f64>) -> Self {
        Self {
            key: entry.id,
            price: entry.price,
            change_24h: entry.change_24h,
            change_7d: entry.change_7d,
            volume: entry.volume,
            history,
        }
    }

    /// Instrument sans variations ni volume (paires dérivées, taux de change)
    pub fn ratio(key: String, price: f64, history: Vec<f64>) -> Self {
        Self {
            key,
            price,
            change_24h: None,
            change_7d: None,
            volume: None,
            history,
        }
    }

    /// Dernier échantillon de l'historique
    pub fn latest_sample(&self) -> Option<f64> {
        self.history.last().copied()
    }
}

/// Série "à plat" : `len` échantillons tous égaux à `value`
///
/// Utilisée quand l'historique réel n'est pas disponible.
pub fn flat_series(value: f64, len: usize) -> Vec<f64> {
    vec![value; len]
}

// ============================================================================
// Structure : FxQuote
// ============================================================================

/// Taux de change courant avec un pseudo-historique à plat
///
/// Le service de change n'a pas d'historique : la série est une
/// approximation, pas une vraie série temporelle.
#[derive(Debug, Clone, PartialEq)]
pub struct FxQuote {
    pub key: String,
    pub rate: f64,
    pub history: Vec<f64>,
}

impl FxQuote {
    pub fn new(key: String, rate: f64, history_len: usize) -> Self {
        Self {
            key,
            rate,
            history: flat_series(rate, history_len),
        }
    }

    /// Vue "instrument" pour la ligne du tableau
    pub fn to_instrument(&self) -> Instrument {
        Instrument::ratio(self.key.clone(), self.rate, self.history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_series() {
        assert_eq!(flat_series(2.5, 3), vec![2.5, 2.5, 2.5]);
        assert!(flat_series(1.0, 0).is_empty());
    }

    #[test]
    fn test_from_market() {
        let entry = MarketEntry {
            id: "bitcoin".to_string(),
            price: 100.0,
            change_24h: Some(1.0),
            change_7d: None,
            volume: Some(5e9),
        };

        let instrument = Instrument::from_market(entry, vec![90.0, 100.0]);

        assert_eq!(instrument.key, "bitcoin");
        assert_eq!(instrument.change_7d, None);
        assert_eq!(instrument.latest_sample(), Some(100.0));
    }

    #[test]
    fn test_fx_quote_is_flat() {
        let quote = FxQuote::new("eur_usd".to_string(), 1.08, 7);
        let instrument = quote.to_instrument();

        assert_eq!(instrument.history.len(), 7);
        assert!(instrument.history.iter().all(|&v| v == 1.08));
        assert_eq!(instrument.change_24h, None);
        assert_eq!(instrument.volume, None);
    }
}
