// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod chart;     // Image du graphique et fenêtre popup
pub mod dashboard; // Tableau des cours, statut, hit-test souris
pub mod events;    // Gestion des événements clavier et souris

// Re-exports pour simplifier les imports
pub use dashboard::{hit_test, render, Column, TableHit};
pub use events::{Event, EventHandler};
