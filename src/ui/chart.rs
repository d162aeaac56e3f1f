// ============================================================================
// Chart - Image du graphique d'un instrument
// ============================================================================
// Le graphique est dessiné dans un Buffer hors-écran de taille fixe : c'est
// "l'image" du graphique, stockée par clé et recopiée telle quelle dans la
// fenêtre popup.
//
// CONCEPTS RATATUI :
// 1. Buffer : grille de cellules (symbole + style), sans terminal
// 2. Widget::render : dessiner un widget dans n'importe quel Buffer
// 3. Clear : effacer la zone sous une popup
// ============================================================================

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Widget,
    },
    Frame,
};

use crate::windows::ChartWindow;

// ============================================================================
// ChartImage
// ============================================================================

/// Image rendue d'un graphique : remplacée en bloc à chaque cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    key: String,
    latest: f64,
    buffer: Buffer,
}

impl ChartImage {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dernière valeur de la série (annotée sur l'image)
    pub fn latest(&self) -> f64 {
        self.latest
    }

    /// Taille (colonnes, lignes)
    pub fn size(&self) -> (u16, u16) {
        (self.buffer.area.width, self.buffer.area.height)
    }

    /// Contenu texte de l'image, une ligne par rangée de cellules
    pub fn text(&self) -> String {
        let area = self.buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| self.buffer.get(x, y).symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Widget qui recopie une ChartImage dans la zone cible (tronquée si besoin)
pub struct ChartImageView<'a> {
    image: &'a ChartImage,
}

impl<'a> ChartImageView<'a> {
    pub fn new(image: &'a ChartImage) -> Self {
        Self { image }
    }
}

impl Widget for ChartImageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);
        let (width, height) = self.image.size();

        for y in 0..height.min(area.height) {
            for x in 0..width.min(area.width) {
                *buf.get_mut(area.x + x, area.y + y) = self.image.buffer.get(x, y).clone();
            }
        }
    }
}

// ============================================================================
// Rendu de l'image
// ============================================================================

/// Dessine le graphique de `series` dans une image de taille `size`
///
/// Retourne None si la série a 0 ou 1 point : la ligne garde alors son
/// image précédente.
pub fn render_chart_image(key: &str, series: &[f64], size: (u16, u16)) -> Option<ChartImage> {
    let latest = match series {
        [] | [_] => return None,
        [.., last] => *last,
    };

    let (width, height) = size;
    let mut buffer = Buffer::empty(Rect::new(0, 0, width, height));

    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, &price)| (i as f64, price))
        .collect();
    let x_max = (points.len() - 1) as f64;

    // Calcule les bornes en un seul passage
    let (min_price, max_price) = points.iter().fold(
        (f64::MAX, f64::MIN),
        |(min, max), &(_x, y)| (min.min(y), max.max(y)),
    );
    let (y_min, y_max) = autoscale(min_price, max_price);
    let y_mid = (y_min + y_max) / 2.0;

    // Lignes de grille horizontales aux quarts de l'axe Y
    let grid: Vec<[(f64, f64); 2]> = (1..4)
        .map(|k| {
            let level = y_min + (y_max - y_min) * k as f64 / 4.0;
            [(0.0, level), (x_max, level)]
        })
        .collect();
    let latest_point = [(x_max, latest)];

    let mut datasets: Vec<Dataset> = grid
        .iter()
        .map(|line| {
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::DarkGray))
                .data(line)
        })
        .collect();

    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&points),
    );

    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Yellow))
            .data(&latest_point),
    );

    let x_axis = Axis::default()
        .title("Hours")
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, x_max])
        .labels(vec![
            Span::raw("0"),
            Span::raw(format!("{}", (x_max / 2.0).round() as u64)),
            Span::raw(format!("{}", x_max as u64)),
        ]);

    let y_axis = Axis::default()
        .title("Price")
        .style(Style::default().fg(Color::Gray))
        .bounds([y_min, y_max])
        .labels(vec![
            Span::raw(price_label(y_min)),
            Span::raw(price_label(y_mid)),
            Span::raw(price_label(y_max)),
        ]);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} 7-Day Price Trend ", key.to_uppercase()))
                .title_alignment(Alignment::Center),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);

    chart.render(buffer.area, &mut buffer);

    // Annotation de la dernière valeur, en haut à droite de la zone interne
    let annotation = format!(" Current: {:.6} ", latest);
    let annotation_width = annotation.chars().count() as u16;
    let x = width.saturating_sub(1).saturating_sub(annotation_width).max(1);
    if height > 2 && width > 2 {
        buffer.set_stringn(
            x,
            1,
            &annotation,
            (width - 1 - x) as usize,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    }

    Some(ChartImage {
        key: key.to_string(),
        latest,
        buffer,
    })
}

/// Bornes de l'axe Y : marge de 5% ; bande de ±1% pour une série plate
fn autoscale(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span > 0.0 {
        let margin = span * 0.05;
        (min - margin, max + margin)
    } else {
        let band = if min == 0.0 { 1.0 } else { min.abs() * 0.01 };
        (min - band, max + band)
    }
}

/// Précision des labels adaptée à l'ordre de grandeur
fn price_label(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1000.0 {
        format!("{:.0}", value)
    } else if magnitude >= 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.6}", value)
    }
}

// ============================================================================
// Fenêtre popup
// ============================================================================

/// Dessine une fenêtre de graphique centrée au-dessus du tableau
pub fn render_chart_window(frame: &mut Frame, window: &ChartWindow, open_windows: usize) {
    let area = window_area(frame.size(), window);

    let hint = if open_windows > 1 {
        format!(" [Esc] Close  [Tab] Next ({} open) ", open_windows)
    } else {
        " [Esc] Close ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(Span::styled(
            format!(" {} Price Trend ", window.key().to_uppercase()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )))
        .title(
            Title::from(Line::from(Span::styled(hint, Style::default().fg(Color::Gray))))
                .position(Position::Bottom)
                .alignment(Alignment::Center),
        );

    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);
    frame.render_widget(ChartImageView::new(window.image()), inner);
}

/// Zone occupée par la fenêtre (bordures comprises) dans `area`
pub fn window_area(area: Rect, window: &ChartWindow) -> Rect {
    let (image_width, image_height) = window.image().size();
    centered_rect(area, image_width + 2, image_height + 3)
}

/// Rect de taille (width, height) centré dans `area`, tronqué si trop grand
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

// ============================================================================
// Tests
// ============================================================================
