// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier, souris et les ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Non-blocking I/O avec timeout (poll)
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};

/// Délai maximal d'attente d'un événement avant de rendre un Tick
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

// ============================================================================
// Enum Event
// ============================================================================

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Événement souris (clic, relâchement, défilement...)
    Mouse(MouseEvent),

    /// Tick régulier : laisse la boucle consommer les résultats du cycle
    Tick,
}

// ============================================================================
// Structure EventHandler
// ============================================================================

/// Gestionnaire d'événements
pub struct EventHandler {
    timeout: Duration,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        Self { timeout: POLL_TIMEOUT }
    }

    /// Lit le prochain événement (bloquant au plus `timeout`)
    ///
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    /// - Resize et autres événements : Tick (le prochain draw s'adapte)
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.timeout)? {
            return Ok(Event::Tick);
        }

        let event = match event::read()? {
            // Sur certains OS, on reçoit Press ET Release : on garde Press
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
            CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
            _ => Event::Tick,
        };

        Ok(event)
    }
}

// ============================================================================
// Helpers : Convertir un Event en action
// ============================================================================

fn key_matches(event: &Event, predicate: impl Fn(KeyCode) -> bool) -> bool {
    match event {
        Event::Key(key) => predicate(key.code),
        _ => false,
    }
}

/// Vérifie si l'événement est la touche 'q' (quitter)
pub fn is_quit_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Esc))
}

/// Entrée ou 'v' : ouvre le graphique de la ligne sélectionnée
pub fn is_view_event(event: &Event) -> bool {
    key_matches(event, |code| {
        matches!(code, KeyCode::Enter | KeyCode::Char('v') | KeyCode::Char('V'))
    })
}

/// Tab : fenêtre de graphique suivante
pub fn is_tab_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Tab))
}

/// Flèche vers le haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    key_matches(event, |code| {
        matches!(code, KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K'))
    })
}

/// Flèche vers le bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    key_matches(event, |code| {
        matches!(code, KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J'))
    })
}

/// Position (colonne, ligne) d'un clic gauche relâché
///
/// Le relâchement compte comme le clic, comme pour un bouton.
pub fn click_position(event: &Event) -> Option<(u16, u16)> {
    match event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column,
            row,
            ..
        }) => Some((*column, *row)),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
