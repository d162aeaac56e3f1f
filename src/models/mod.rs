// ============================================================================
// Module : models
// ============================================================================
// Structures de données de l'application : instruments, paires dérivées,
// taux de change et lignes du tableau.
// ============================================================================

pub mod instrument; // Instrument, FxQuote, séries à plat
pub mod pair;       // Calcul des paires dérivées
pub mod row;        // Ligne du tableau et formatage des cellules
pub mod status;     // Ligne de statut

// Re-export des structures principales pour simplifier les imports
pub use instrument::{flat_series, FxQuote, Instrument};
pub use pair::{derive_pair, DerivedPair};
pub use row::{Row, RowKind};
pub use status::{StatusLevel, StatusLine};
