// ============================================================================
// CryptoWidget - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // API CoinGecko et taux de change
pub mod app;     // État de l'application
pub mod clock;   // Horloge injectable (tokio ou manuelle en test)
pub mod config;  // Configuration et surcharges d'environnement
pub mod models;  // Structures de données
pub mod refresh; // Cycle de rafraîchissement et boucle périodique
pub mod ui;      // Interface utilisateur
pub mod windows; // Registre des fenêtres de graphique
