//! Small reusable spans and blocks.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};

use super::theme::ThemePalette;
use crate::health::HealthSnapshot;
use crate::model::types::RiskLevel;

pub fn health_badge(snapshot: &HealthSnapshot, stale: bool, palette: ThemePalette) -> Span<'static> {
    let mut label = format!("● {}", snapshot.status.label());
    if stale {
        label.push_str(" (stale)");
    }
    Span::styled(label, palette.health_style(&snapshot.status))
}

pub fn risk_badge(level: RiskLevel, palette: ThemePalette) -> Span<'static> {
    Span::styled(format!("{:<6}", level.label()), palette.risk_style(level))
}

/// Titled, bordered block; the border brightens when focused.
pub fn panel(title: String, focused: bool, palette: ThemePalette) -> Block<'static> {
    Block::default()
        .title(Span::styled(title, palette.title()))
        .borders(Borders::ALL)
        .border_style(palette.border_style(focused))
}

/// `label: value` line with a muted label.
pub fn stat_line(label: &str, value: String, palette: ThemePalette) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<16}"), palette.hint_style()),
        Span::styled(value, Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)),
    ])
}
