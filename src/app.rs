// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// - App appartient au seul thread UI : le cache d'images et le registre de
//   fenêtres ne sont jamais partagés, donc pas de Mutex
// ============================================================================

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::Config;
use crate::models::{Row, RowKind, StatusLine};
use crate::refresh::CycleReport;
use crate::ui::chart::{render_chart_image, ChartImage};
use crate::windows::ChartWindows;

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Lignes du tableau, une par instrument suivi
    pub rows: Vec<Row>,

    /// Index de la ligne sélectionnée
    pub selected_index: usize,

    /// Ligne de statut, écrasée à chaque cycle
    pub status: StatusLine,

    /// Fenêtres de graphique ouvertes
    pub windows: ChartWindows,

    /// Indique si l'utilisateur a demandé à quitter (attend confirmation)
    /// - Première pression de 'q' : confirm_quit = true
    /// - Deuxième pression de 'q' : running = false
    pub confirm_quit: bool,

    /// Dernière image rendue pour chaque clé
    images: HashMap<String, ChartImage>,

    /// Taille des images de graphique
    image_size: (u16, u16),
}

impl App {
    /// Crée l'état initial : toutes les lignes en "Loading..."
    pub fn new(config: &Config) -> Self {
        let rows = config
            .row_keys()
            .into_iter()
            .map(|key| {
                let kind = if config.coins.contains(&key) {
                    RowKind::Coin
                } else if key == config.fx_key {
                    RowKind::Fx
                } else {
                    RowKind::Pair
                };
                Row::new(key, kind)
            })
            .collect();

        Self::with_rows(rows, config.image_size)
    }

    /// Crée une App avec des lignes préparées
    pub fn with_rows(rows: Vec<Row>, image_size: (u16, u16)) -> Self {
        Self {
            running: true,
            rows,
            selected_index: 0,
            status: StatusLine::default(),
            windows: ChartWindows::new(),
            confirm_quit: false,
            images: HashMap::new(),
            image_size,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Navigue vers le haut (saturating_sub : ne descend pas sous 0)
    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.rows.len().saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    /// Sélectionne une ligne (ignoré si hors limites)
    pub fn select(&mut self, index: usize) {
        if index < self.rows.len() {
            self.selected_index = index;
        }
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected_index)
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Application d'un cycle
    // ========================================================================

    /// Applique le résultat d'un cycle : lignes, images, fenêtres ouvertes
    ///
    /// Retourne le nombre de lignes modifiées. Un cycle avorté (batch en
    /// échec) ne modifie que la ligne de statut.
    pub fn apply_report(&mut self, mut report: CycleReport) -> usize {
        self.status = report.status;

        let mut updated = 0;
        for row in &mut self.rows {
            let Some(instrument) = report.instruments.remove(&row.key) else {
                continue;
            };

            // Image entièrement régénérée, ou image précédente conservée
            if let Some(image) = render_chart_image(&row.key, &instrument.history, self.image_size) {
                if self.windows.refresh(&row.key, &image) {
                    debug!(key = %row.key, "Open chart window refreshed");
                }
                self.images.insert(row.key.clone(), image);
            }

            row.update(instrument);
            updated += 1;
        }

        info!(updated, status = %self.status.text, "Applied refresh cycle");
        updated
    }

    // ========================================================================
    // Fenêtres de graphique
    // ========================================================================

    /// Dernière image rendue pour `key`
    pub fn image(&self, key: &str) -> Option<&ChartImage> {
        self.images.get(key)
    }

    /// Ouvre (ou remplace) la fenêtre de `key`
    ///
    /// Sans image disponible, rien ne s'ouvre et la fonction retourne false.
    pub fn open_chart(&mut self, key: &str) -> bool {
        match self.images.get(key) {
            Some(image) => {
                info!(key, "User opened chart window");
                self.windows.open(key, image.clone());
                true
            }
            None => {
                debug!(key, "No chart image yet, ignoring");
                false
            }
        }
    }

    pub fn open_selected_chart(&mut self) -> bool {
        match self.selected_row().map(|row| row.key.clone()) {
            Some(key) => self.open_chart(&key),
            None => false,
        }
    }

    pub fn close_top_chart(&mut self) {
        if let Some(window) = self.windows.close_top() {
            debug!(key = %window.key(), "Chart window closed");
        }
    }

    pub fn cycle_charts(&mut self) {
        self.windows.cycle();
    }

    pub fn has_open_chart(&self) -> bool {
        !self.windows.is_empty()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Instrument;

    fn app() -> App {
        App::new(&Config::default())
    }

    fn coin(key: &str, price: f64, history: Vec<f64>) -> Instrument {
        Instrument {
            key: key.to_string(),
            price,
            change_24h: Some(1.0),
            change_7d: Some(2.0),
            volume: Some(1e9),
            history,
        }
    }

    fn report(instruments: Vec<Instrument>) -> CycleReport {
        CycleReport {
            status: StatusLine::info("Last update: 12:00:00"),
            instruments: instruments
                .into_iter()
                .map(|i| (i.key.clone(), i))
                .collect(),
        }
    }

    #[test]
    fn test_app_creation() {
        let app = app();
        assert!(app.is_running());
        assert_eq!(app.rows.len(), 10);
        assert!(app.rows.iter().all(|row| !row.has_data()));
        assert_eq!(app.rows[7].label, "ETH/BTC");
        assert_eq!(app.rows[9].label, "EUR/USD");
        assert_eq!(app.status.text, "Initializing...");
    }

    #[test]
    fn test_navigation() {
        let mut app = app();

        app.navigate_up();
        assert_eq!(app.selected_index, 0);

        for _ in 0..20 {
            app.navigate_down();
        }
        assert_eq!(app.selected_index, 9);

        app.select(3);
        assert_eq!(app.selected_row().unwrap().key, "dogecoin");
        app.select(42);
        assert_eq!(app.selected_index, 3);
    }

    #[test]
    fn test_apply_report_updates_rows_and_images() {
        let mut app = app();

        let updated = app.apply_report(report(vec![
            coin("bitcoin", 100.0, vec![90.0, 95.0, 100.0]),
            coin("solana", 10.0, vec![10.0]),
            coin("unknown", 1.0, vec![1.0, 2.0]),
        ]));

        assert_eq!(updated, 2);
        assert!(app.rows[0].has_data());
        assert!(app.image("bitcoin").is_some());
        // Série trop courte : données affichées mais pas d'image
        assert!(app.rows[2].has_data());
        assert!(app.image("solana").is_none());
        assert!(app.image("unknown").is_none());
    }

    #[test]
    fn test_failed_cycle_mutates_no_rows() {
        let mut app = app();
        app.apply_report(report(vec![coin("bitcoin", 100.0, vec![90.0, 100.0])]));
        let before = app.rows[0].quote.clone();

        let updated = app.apply_report(CycleReport::failed(StatusLine::error(
            "Rate limited - waiting for next cycle",
        )));

        assert_eq!(updated, 0);
        assert!(app.status.is_error());
        assert_eq!(app.rows[0].quote, before);
        assert!(app.rows[1..].iter().all(|row| !row.has_data()));
    }

    #[test]
    fn test_refresh_updates_open_window_in_place() {
        let mut app = app();
        app.apply_report(report(vec![coin("bitcoin", 100.0, vec![90.0, 100.0])]));

        assert!(app.open_chart("bitcoin"));
        let serial = app.windows.top().unwrap().serial();

        app.apply_report(report(vec![coin("bitcoin", 120.0, vec![100.0, 120.0])]));

        assert_eq!(app.windows.len(), 1);
        let window = app.windows.get("bitcoin").unwrap();
        assert_eq!(window.serial(), serial);
        assert_eq!(window.image().latest(), 120.0);
        assert_eq!(app.image("bitcoin"), Some(window.image()));
    }

    #[test]
    fn test_short_series_keeps_previous_image() {
        let mut app = app();
        app.apply_report(report(vec![coin("bitcoin", 100.0, vec![90.0, 100.0])]));
        app.open_chart("bitcoin");

        app.apply_report(report(vec![coin("bitcoin", 130.0, vec![130.0])]));

        assert_eq!(app.image("bitcoin").unwrap().latest(), 100.0);
        assert_eq!(app.windows.top().unwrap().image().latest(), 100.0);
        assert_eq!(app.rows[0].quote.as_ref().unwrap().price, 130.0);
    }

    #[test]
    fn test_open_chart_requires_image() {
        let mut app = app();
        assert!(!app.open_chart("bitcoin"));
        assert!(!app.open_selected_chart());
        assert!(!app.has_open_chart());
    }

    #[test]
    fn test_closed_rows_only_cache_images() {
        let mut app = app();
        app.apply_report(report(vec![
            coin("bitcoin", 100.0, vec![90.0, 100.0]),
            coin("ethereum", 10.0, vec![9.0, 10.0]),
        ]));
        app.open_chart("bitcoin");

        app.apply_report(report(vec![coin("ethereum", 11.0, vec![10.0, 11.0])]));

        assert_eq!(app.windows.len(), 1);
        assert_eq!(app.image("ethereum").unwrap().latest(), 11.0);

        app.select(1);
        assert!(app.open_selected_chart());
        assert_eq!(app.windows.top().unwrap().key(), "ethereum");
        app.close_top_chart();
        assert_eq!(app.windows.top().unwrap().key(), "bitcoin");
    }
}
