// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine le tableau des cours et route vers la fenêtre de graphique au
// premier plan.
//
// Le tableau est dessiné cellule par cellule dans des Rect calculés par
// table_columns() : le même calcul sert au rendu et au hit-test de la
// souris, la colonne cliquée est donc toujours celle affichée.
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Layout : découpage de l'espace en zones
// 3. Style : couleurs et attributs de texte
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::{Row, StatusLine};
use crate::ui::chart::{render_chart_window, window_area};

// ============================================================================
// Colonnes du tableau
// ============================================================================

/// Colonnes du tableau, dans l'ordre d'affichage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Pair,
    Price,
    Change24h,
    Change7d,
    Volume,
    View,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Pair,
        Column::Price,
        Column::Change24h,
        Column::Change7d,
        Column::Volume,
        Column::View,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Column::Pair => "Pair",
            Column::Price => "Price",
            Column::Change24h => "24h Change",
            Column::Change7d => "7d Change",
            Column::Volume => "24h Volume",
            Column::View => "View Graph",
        }
    }

    fn width(self) -> u16 {
        match self {
            Column::Pair => 12,
            Column::Price => 18,
            Column::Change24h => 12,
            Column::Change7d => 12,
            Column::Volume => 14,
            Column::View => 12,
        }
    }

    fn alignment(self) -> Alignment {
        match self {
            Column::Pair => Alignment::Left,
            Column::View => Alignment::Center,
            _ => Alignment::Right,
        }
    }
}

/// Cellule visée par un clic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHit {
    pub row: usize,
    pub column: Column,
}

const VIEW_LABEL: &str = "View";

// ============================================================================
// Fonction principale de rendu
// ============================================================================

/// Dessine l'interface complète : tableau, puis fenêtre au premier plan
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, chunks[0]);
    render_status(frame, &app.status, chunks[1]);
    render_table(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    if let Some(window) = app.windows.top() {
        render_chart_window(frame, window, app.windows.len());
    }
}

// ============================================================================
// Layout : Découpage de l'écran
// ============================================================================

/// Crée le layout principal (header, statut, tableau, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Ligne de statut
            Constraint::Min(0),    // Tableau : tout le reste
            Constraint::Length(3), // Footer
        ])
        .split(area)
        .to_vec()
}

fn table_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Markets ")
}

/// Découpe la zone interne du tableau en colonnes
///
/// La dernière zone (Min(0)) absorbe la largeur restante et n'est pas une
/// colonne : seules les Column::ALL.len() premières zones sont retournées.
fn table_columns(inner: Rect) -> Vec<Rect> {
    let constraints: Vec<Constraint> = Column::ALL
        .iter()
        .map(|column| Constraint::Length(column.width()))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let mut columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner)
        .to_vec();
    columns.truncate(Column::ALL.len());
    columns
}

// ============================================================================
// Hit-test souris
// ============================================================================

/// Cellule du tableau sous la position (x, y) de l'écran `area`
///
/// Retourne None sur l'en-tête, hors des lignes, ou sous une fenêtre de
/// graphique ouverte.
pub fn hit_test(app: &App, area: Rect, x: u16, y: u16) -> Option<TableHit> {
    if let Some(window) = app.windows.top() {
        if contains(window_area(area, window), x, y) {
            return None;
        }
    }

    let table_area = create_layout(area)[2];
    let inner = table_block().inner(table_area);
    if !contains(inner, x, y) || y == inner.y {
        return None;
    }

    let row = (y - inner.y - 1) as usize;
    if row >= app.rows.len() {
        return None;
    }

    table_columns(inner)
        .iter()
        .zip(Column::ALL)
        .find(|(rect, _)| x >= rect.x && x < rect.x + rect.width)
        .map(|(_, column)| TableHit { row, column })
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

// ============================================================================
// Header et statut
// ============================================================================

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" CryptoWidget ")
        .title_alignment(Alignment::Center);

    let text = Line::from(Span::styled(
        "Crypto & FX prices - 7 day trends",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, status: &StatusLine, area: Rect) {
    let color = if status.is_error() { Color::Red } else { Color::Green };

    let paragraph = Paragraph::new(Line::from(Span::styled(
        status.text.as_str(),
        Style::default().fg(color),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Status "),
    );

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tableau des cours
// ============================================================================

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let block = table_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let columns = table_columns(inner);
    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    for (rect, column) in columns.iter().zip(Column::ALL) {
        render_cell(frame, *rect, inner.y, column.title(), column.alignment(), header_style);
    }

    // Lignes au-delà de la hauteur disponible : non affichées
    let visible = (inner.height - 1) as usize;
    for (index, row) in app.rows.iter().enumerate().take(visible) {
        let y = inner.y + 1 + index as u16;
        let selected = index == app.selected_index;
        let has_image = app.image(&row.key).is_some();

        for (rect, column) in columns.iter().zip(Column::ALL) {
            let mut style = cell_style(row, column, has_image);
            if selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            render_cell(frame, *rect, y, &cell_text(row, column), column.alignment(), style);
        }
    }
}

fn render_cell(frame: &mut Frame, column: Rect, y: u16, text: &str, alignment: Alignment, style: Style) {
    let area = Rect::new(column.x, y, column.width, 1);
    let paragraph = Paragraph::new(Span::raw(format!(" {} ", text)))
        .style(style)
        .alignment(alignment);
    frame.render_widget(paragraph, area);
}

fn cell_text(row: &Row, column: Column) -> String {
    match column {
        Column::Pair => row.label.clone(),
        Column::Price => row.price_text(),
        Column::Change24h => row.change_24h_text(),
        Column::Change7d => row.change_7d_text(),
        Column::Volume => row.volume_text(),
        Column::View => VIEW_LABEL.to_string(),
    }
}

/// Couleur d'une cellule : variation en vert/rouge, "View" grisé sans image
fn cell_style(row: &Row, column: Column, has_image: bool) -> Style {
    if !row.has_data() {
        return Style::default().fg(Color::Gray);
    }

    match column {
        Column::Change24h => change_style(row.is_positive()),
        Column::Change7d => change_style(
            row.quote
                .as_ref()
                .and_then(|q| q.change_7d)
                .map(|c| c >= 0.0),
        ),
        Column::View if has_image => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::UNDERLINED),
        Column::View => Style::default().fg(Color::DarkGray),
        Column::Pair => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        _ => Style::default(),
    }
}

fn change_style(positive: Option<bool>) -> Style {
    match positive {
        Some(true) => Style::default().fg(Color::Green),
        Some(false) => Style::default().fg(Color::Red),
        None => Style::default(),
    }
}

// ============================================================================
// Footer : Instructions
// ============================================================================

/// Dessine le footer avec les raccourcis clavier
fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let shortcuts = if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled(
                "⚠  Appuyez sur ",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "[q]",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])
    } else if app.has_open_chart() {
        Line::from(vec![
            Span::styled("[Esc]", key_style),
            Span::raw(" Close chart  "),
            Span::styled("[Tab]", key_style),
            Span::raw(" Next chart  "),
            Span::styled("[q]", key_style),
            Span::raw(" Quit"),
        ])
    } else {
        Line::from(vec![
            Span::styled("[q]", key_style),
            Span::raw(" Quit  "),
            Span::styled("[↑↓ / j k]", key_style),
            Span::raw(" Navigate  "),
            Span::styled("[Enter / v / click View]", key_style),
            Span::raw(" Chart"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests
// ============================================================================
