// ============================================================================
// Registre des fenêtres de graphique
// ============================================================================
// Au plus une fenêtre ouverte par clé d'instrument.
// - open() : détruit la fenêtre existante pour cette clé et en crée une
//   nouvelle (nouveau numéro de série)
// - refresh() : remplace l'image d'une fenêtre ouverte, sans la recréer
//
// L'ordre du Vec est l'ordre d'empilement : la dernière fenêtre est au
// premier plan.
// ============================================================================

use tracing::debug;

use crate::ui::chart::ChartImage;

/// Une fenêtre de graphique ouverte
#[derive(Debug, Clone)]
pub struct ChartWindow {
    key: String,
    serial: u64,
    image: ChartImage,
}

impl ChartWindow {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Numéro unique de la fenêtre : change à chaque (ré)ouverture
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn image(&self) -> &ChartImage {
        &self.image
    }
}

/// Fenêtres ouvertes, indexées par clé
#[derive(Debug, Default)]
pub struct ChartWindows {
    stack: Vec<ChartWindow>,
    next_serial: u64,
}

impl ChartWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ouvre (ou remplace) la fenêtre de `key` et la place au premier plan
    pub fn open(&mut self, key: &str, image: ChartImage) -> &ChartWindow {
        self.close(key);

        self.next_serial += 1;
        debug!(key, serial = self.next_serial, "Opening chart window");
        self.stack.push(ChartWindow {
            key: key.to_string(),
            serial: self.next_serial,
            image,
        });

        &self.stack[self.stack.len() - 1]
    }

    /// Remplace l'image de la fenêtre de `key` si elle est ouverte
    ///
    /// Retourne true si une fenêtre a été mise à jour.
    pub fn refresh(&mut self, key: &str, image: &ChartImage) -> bool {
        match self.stack.iter_mut().find(|w| w.key == key) {
            Some(window) => {
                window.image = image.clone();
                true
            }
            None => false,
        }
    }

    /// Ferme la fenêtre de `key` ; retourne true si elle était ouverte
    pub fn close(&mut self, key: &str) -> bool {
        let before = self.stack.len();
        self.stack.retain(|w| w.key != key);
        self.stack.len() != before
    }

    /// Ferme la fenêtre au premier plan
    pub fn close_top(&mut self) -> Option<ChartWindow> {
        self.stack.pop()
    }

    /// Fait passer la fenêtre du fond au premier plan
    pub fn cycle(&mut self) {
        if self.stack.len() > 1 {
            self.stack.rotate_left(1);
        }
    }

    pub fn top(&self) -> Option<&ChartWindow> {
        self.stack.last()
    }

    pub fn get(&self, key: &str) -> Option<&ChartWindow> {
        self.stack.iter().find(|w| w.key == key)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
