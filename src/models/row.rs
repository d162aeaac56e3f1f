// ============================================================================
// Structure : Row
// ============================================================================
// Une ligne du tableau : une clé, un libellé, un type et le dernier
// instrument reçu (None tant que rien n'est chargé).
//
// Le formatage des cellules vit ici pour être testable sans terminal.
// ============================================================================

use crate::models::Instrument;

/// Type de ligne : détermine le format du prix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Cryptomonnaie cotée en USD ("$1,234.56")
    Coin,
    /// Paire dérivée (6 décimales)
    Pair,
    /// Taux de change (4 décimales)
    Fx,
}

/// Ligne du tableau
#[derive(Debug, Clone)]
pub struct Row {
    /// Clé de l'instrument (ex: "bitcoin", "eth_btc")
    pub key: String,

    /// Libellé affiché (ex: "BITCOIN", "ETH/BTC")
    pub label: String,

    pub kind: RowKind,

    /// Dernier instrument reçu
    /// - Some : données affichées
    /// - None : "Loading..."
    pub quote: Option<Instrument>,
}

impl Row {
    pub fn new(key: String, kind: RowKind) -> Self {
        let label = match kind {
            RowKind::Coin => key.to_uppercase(),
            RowKind::Pair | RowKind::Fx => key.replace('_', "/").to_uppercase(),
        };

        Self {
            key,
            label,
            kind,
            quote: None,
        }
    }

    /// Remplace les données de la ligne
    pub fn update(&mut self, instrument: Instrument) {
        self.quote = Some(instrument);
    }

    pub fn has_data(&self) -> bool {
        self.quote.is_some()
    }

    pub fn price_text(&self) -> String {
        match &self.quote {
            Some(q) => match self.kind {
                RowKind::Coin => format!("${}", format_thousands(q.price, 2)),
                RowKind::Pair => format!("{:.6}", q.price),
                RowKind::Fx => format!("{:.4}", q.price),
            },
            None => "Loading...".to_string(),
        }
    }

    pub fn change_24h_text(&self) -> String {
        format_change(self.quote.as_ref().and_then(|q| q.change_24h))
    }

    pub fn change_7d_text(&self) -> String {
        format_change(self.quote.as_ref().and_then(|q| q.change_7d))
    }

    pub fn volume_text(&self) -> String {
        match self.quote.as_ref().and_then(|q| q.volume) {
            Some(volume) if volume >= 1e9 => format!("${:.2}B", volume / 1e9),
            Some(volume) => format!("${:.2}M", volume / 1e6),
            None => String::new(),
        }
    }

    /// Vrai si la variation 24h est positive ou nulle
    ///
    /// Les lignes sans variation (paires, change) ne sont ni vertes ni rouges.
    pub fn is_positive(&self) -> Option<bool> {
        self.quote
            .as_ref()
            .and_then(|q| q.change_24h)
            .map(|c| c >= 0.0)
    }
}

fn format_change(change: Option<f64>) -> String {
    change.map(|c| format!("{:.2}%", c)).unwrap_or_default()
}

/// Formate un nombre avec séparateur de milliers : 12345.678 -> "12,345.68"
pub fn format_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

// ============================================================================
// Tests
// ============================================================================
