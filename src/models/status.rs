// ============================================================================
// Ligne de statut
// ============================================================================
// Unique retour visible des erreurs : écrasée à chaque cycle.
// ============================================================================

/// Gravité du message (détermine la couleur)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub level: StatusLevel,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: StatusLevel::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::info("Initializing...")
    }
}
