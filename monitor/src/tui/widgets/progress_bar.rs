//! Progress bar widget.
//!
//! Draws checklist progress as a horizontal bar followed by a label:
//!
//! ```text
//! ████████████████░░░░░░░░░░░░░░░░  3/5 (60%)
//! ```
//!
//! The label is built from the `showTaskCount` and `showPercentage` settings
//! and is dropped when the area is too narrow to fit it next to a bar. A
//! document with no tasks shows a dimmed "No tasks" message instead of an
//! empty (or full) bar.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::settings::{parse_hex_color, Settings};
use crate::types::TaskCount;

/// Symbol for completed cells.
const FILLED: &str = "█";

/// Symbol for remaining cells.
const EMPTY: &str = "░";

/// Gap between the bar and its label.
const LABEL_GAP: u16 = 2;

/// Narrowest bar drawn next to a label.
const MIN_BAR_WIDTH: u16 = 4;

/// Colour used when a configured colour cannot be parsed.
const FALLBACK_COLOR: Color = Color::Green;

/// What the bar is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarState {
    /// No document is open.
    NoDocument,
    /// Counts for the active document.
    Counts(TaskCount),
    /// The bar could not be drawn normally.
    Error(String),
}

/// Widget that renders a [`BarState`] using the user's [`Settings`].
#[derive(Debug)]
pub struct ProgressBarWidget<'a> {
    state: &'a BarState,
    settings: &'a Settings,
}

impl<'a> ProgressBarWidget<'a> {
    #[must_use]
    pub fn new(state: &'a BarState, settings: &'a Settings) -> Self {
        Self { state, settings }
    }

    /// The label shown next to the bar, or `None` if both parts are disabled.
    fn label(&self, count: TaskCount) -> Option<String> {
        let counts = format!("{}/{}", count.completed, count.total);
        let percent = format!("{}%", count.percent());
        match (self.settings.show_task_count, self.settings.show_percentage) {
            (true, true) => Some(format!("{counts} ({percent})")),
            (true, false) => Some(counts),
            (false, true) => Some(percent),
            (false, false) => None,
        }
    }

    fn bar_color(&self, percent: u32) -> Color {
        parse_hex_color(self.settings.color_for(percent))
            .map_or(FALLBACK_COLOR, |(r, g, b)| Color::Rgb(r, g, b))
    }

    fn render_message(area: Rect, buf: &mut Buffer, message: &str, style: Style) {
        let y = area.y + area.height / 2;
        buf.set_stringn(area.x, y, message, area.width as usize, style);
    }

    fn render_counts(&self, count: TaskCount, area: Rect, buf: &mut Buffer) {
        let label = self.label(count);
        let label_width = label.as_ref().map_or(0, |l| l.chars().count() as u16);

        let (bar_width, label_x) = if label_width > 0
            && area.width >= label_width + LABEL_GAP + MIN_BAR_WIDTH
        {
            let bar_width = area.width - label_width - LABEL_GAP;
            (bar_width, Some(area.x + bar_width + LABEL_GAP))
        } else {
            (area.width, None)
        };

        let percent = count.percent();
        let filled = filled_cells(bar_width, percent);
        let bar_style = Style::default().fg(self.bar_color(percent));
        let track_style = Style::default().fg(Color::DarkGray);

        for y in area.y..area.y + area.height {
            for i in 0..bar_width {
                let (symbol, style) = if i < filled {
                    (FILLED, bar_style)
                } else {
                    (EMPTY, track_style)
                };
                buf.set_string(area.x + i, y, symbol, style);
            }
        }

        if let (Some(label), Some(x)) = (label, label_x) {
            let y = area.y + area.height / 2;
            buf.set_string(x, y, label, Style::default().add_modifier(Modifier::BOLD));
        }
    }
}

/// Cells to fill for `percent` of `width`, rounded down so that only a
/// finished list shows a full bar.
fn filled_cells(width: u16, percent: u32) -> u16 {
    let filled = u32::from(width) * percent.min(100) / 100;
    u16::try_from(filled).unwrap_or(width)
}

impl Widget for ProgressBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        match self.state {
            BarState::NoDocument => Self::render_message(
                area,
                buf,
                "No document open",
                Style::default().fg(Color::DarkGray),
            ),
            BarState::Counts(count) if count.is_empty() => Self::render_message(
                area,
                buf,
                "No tasks",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
            BarState::Counts(count) => self.render_counts(*count, area, buf),
            BarState::Error(message) => Self::render_message(
                area,
                buf,
                message,
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(total: u32, completed: u32) -> BarState {
        BarState::Counts(TaskCount { total, completed })
    }

    fn render(state: &BarState, settings: &Settings, width: u16) -> Buffer {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        ProgressBarWidget::new(state, settings).render(area, &mut buf);
        buf
    }

    fn content(buf: &Buffer) -> String {
        buf.content.iter().map(|cell| cell.symbol()).collect()
    }

    // ============================================
    // Label Tests
    // ============================================

    #[test]
    fn label_follows_settings() {
        let mut settings = Settings::default();
        let state = count(5, 3);
        let c = TaskCount {
            total: 5,
            completed: 3,
        };

        let widget = ProgressBarWidget::new(&state, &settings);
        assert_eq!(widget.label(c).as_deref(), Some("3/5 (60%)"));

        settings.show_percentage = false;
        let widget = ProgressBarWidget::new(&state, &settings);
        assert_eq!(widget.label(c).as_deref(), Some("3/5"));

        settings.show_task_count = false;
        let widget = ProgressBarWidget::new(&state, &settings);
        assert_eq!(widget.label(c), None);

        settings.show_percentage = true;
        let widget = ProgressBarWidget::new(&state, &settings);
        assert_eq!(widget.label(c).as_deref(), Some("60%"));
    }

    #[test]
    fn filled_cells_rounds_down() {
        assert_eq!(filled_cells(10, 0), 0);
        assert_eq!(filled_cells(10, 33), 3);
        assert_eq!(filled_cells(10, 99), 9);
        assert_eq!(filled_cells(10, 100), 10);
        assert_eq!(filled_cells(0, 50), 0);
    }

    // ============================================
    // Rendering Tests
    // ============================================

    #[test]
    fn renders_bar_and_label() {
        let settings = Settings::default();
        let buf = render(&count(4, 2), &settings, 30);
        let text = content(&buf);

        assert!(text.contains("2/4 (50%)"), "label missing: {text}");
        // 30 - 9 label - 2 gap = 19 bar cells, half filled
        assert_eq!(text.matches(FILLED).count(), 9);
        assert_eq!(text.matches(EMPTY).count(), 10);
    }

    #[test]
    fn empty_document_shows_no_tasks_not_a_bar() {
        let settings = Settings::default();
        let buf = render(&count(0, 0), &settings, 30);
        let text = content(&buf);

        assert!(text.contains("No tasks"));
        assert!(!text.contains(FILLED));
        assert!(!text.contains(EMPTY));
    }

    #[test]
    fn no_document_state() {
        let settings = Settings::default();
        let buf = render(&BarState::NoDocument, &settings, 30);
        assert!(content(&buf).contains("No document open"));
    }

    #[test]
    fn error_state_is_red() {
        let settings = Settings::default();
        let state = BarState::Error("Progress unavailable".to_string());
        let buf = render(&state, &settings, 30);

        assert!(content(&buf).contains("Progress unavailable"));
        assert_eq!(buf[(0, 0)].fg, Color::Red);
    }

    #[test]
    fn narrow_area_drops_label() {
        let settings = Settings::default();
        let buf = render(&count(4, 4), &settings, 8);
        let text = content(&buf);

        assert!(!text.contains('/'));
        assert_eq!(text.matches(FILLED).count(), 8);
    }

    #[test]
    fn bar_uses_configured_color() {
        let settings = Settings {
            bar_color: "#102030".to_string(),
            ..Settings::default()
        };
        let buf = render(&count(2, 2), &settings, 20);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(0x10, 0x20, 0x30));
    }

    #[test]
    fn bar_uses_threshold_color() {
        let settings = Settings {
            color_thresholds: Some(crate::settings::ColorThresholds::default()),
            ..Settings::default()
        };
        // 1 of 10 is below the low threshold
        let buf = render(&count(10, 1), &settings, 40);
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(0xe5, 0x39, 0x35));
    }

    #[test]
    fn unparseable_color_falls_back() {
        let settings = Settings {
            bar_color: "green".to_string(),
            ..Settings::default()
        };
        let buf = render(&count(1, 1), &settings, 20);
        assert_eq!(buf[(0, 0)].fg, FALLBACK_COLOR);
    }

    #[test]
    fn handles_zero_area() {
        let settings = Settings::default();
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        ProgressBarWidget::new(&count(1, 0), &settings).render(area, &mut buf);
    }

    #[test]
    fn taller_bar_fills_every_row() {
        let settings = Settings::default();
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        ProgressBarWidget::new(&count(1, 1), &settings).render(area, &mut buf);

        for y in 0..3 {
            assert_eq!(buf[(0, y)].symbol(), FILLED);
        }
    }
}
