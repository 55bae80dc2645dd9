//! Color palette and styles for the console views.
//!
//! Risk levels, reason severities and action priorities share one semantic
//! scale (red, amber, green) so the eye can match rows to detail entries.

use ratatui::style::{Color, Modifier, Style};

use crate::health::HealthStatus;
use crate::model::types::RiskLevel;
use crate::ui::inspector::{ActionPriority, ReasonSeverity};

pub mod colors {
    use ratatui::style::Color;

    // ── base ───────────────────────────────────────────────────────────────

    /// Deep background - primary canvas color
    pub const BG_DEEP: Color = Color::Rgb(26, 27, 38); // #1a1b26

    /// Elevated surface - cards, popups
    pub const BG_SURFACE: Color = Color::Rgb(36, 40, 59); // #24283b

    pub const BORDER: Color = Color::Rgb(59, 66, 97); // #3b4261
    pub const BORDER_FOCUS: Color = Color::Rgb(125, 145, 200); // #7d91c8

    pub const TEXT_PRIMARY: Color = Color::Rgb(192, 202, 245); // #c0caf5
    pub const TEXT_MUTED: Color = Color::Rgb(105, 114, 158); // #696e9e

    pub const ACCENT_PRIMARY: Color = Color::Rgb(122, 162, 247); // #7aa2f7
    pub const ACCENT_SECONDARY: Color = Color::Rgb(187, 154, 247); // #bb9af7

    // ── risk scale ─────────────────────────────────────────────────────────

    pub const RISK_HIGH: Color = Color::Rgb(247, 118, 142); // #f7768e
    pub const RISK_MEDIUM: Color = Color::Rgb(224, 175, 104); // #e0af68
    pub const RISK_LOW: Color = Color::Rgb(158, 206, 106); // #9ece6a

    pub const STATUS_INFO: Color = Color::Rgb(125, 207, 255); // #7dcfff
}

#[derive(Clone, Copy)]
pub struct ThemePalette {
    pub accent: Color,
    pub accent_alt: Color,
    pub bg: Color,
    pub fg: Color,
    pub surface: Color,
    pub hint: Color,
    pub border: Color,
    pub high: Color,
    pub medium: Color,
    pub low: Color,
    pub info: Color,
}

impl ThemePalette {
    pub fn dark() -> Self {
        Self {
            accent: colors::ACCENT_PRIMARY,
            accent_alt: colors::ACCENT_SECONDARY,
            bg: colors::BG_DEEP,
            fg: colors::TEXT_PRIMARY,
            surface: colors::BG_SURFACE,
            hint: colors::TEXT_MUTED,
            border: colors::BORDER,
            high: colors::RISK_HIGH,
            medium: colors::RISK_MEDIUM,
            low: colors::RISK_LOW,
            info: colors::STATUS_INFO,
        }
    }

    pub fn light() -> Self {
        Self {
            accent: Color::Rgb(47, 107, 231),
            accent_alt: Color::Rgb(124, 93, 198),
            bg: Color::Rgb(250, 250, 252),
            fg: Color::Rgb(36, 41, 46),
            surface: Color::Rgb(240, 241, 245),
            hint: Color::Rgb(125, 134, 144),
            border: Color::Rgb(216, 222, 228),
            high: Color::Rgb(200, 40, 60),
            medium: Color::Rgb(177, 120, 20),
            low: Color::Rgb(45, 138, 72),
            info: Color::Rgb(30, 120, 180),
        }
    }

    pub fn title(self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn hint_style(self) -> Style {
        Style::default().fg(self.hint)
    }

    pub fn border_style(self, focused: bool) -> Style {
        if focused {
            Style::default().fg(colors::BORDER_FOCUS)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn risk_color(self, level: RiskLevel) -> Color {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn risk_style(self, level: RiskLevel) -> Style {
        let style = Style::default().fg(self.risk_color(level));
        if level == RiskLevel::High {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn severity_style(self, severity: ReasonSeverity) -> Style {
        let color = match severity {
            ReasonSeverity::Critical => self.high,
            ReasonSeverity::Warning => self.medium,
            ReasonSeverity::Info => self.info,
        };
        Style::default().fg(color)
    }

    pub fn priority_style(self, priority: ActionPriority) -> Style {
        let color = match priority {
            ActionPriority::High => self.high,
            ActionPriority::Medium => self.medium,
            ActionPriority::Low => self.low,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn health_style(self, status: &HealthStatus) -> Style {
        let color = match status {
            HealthStatus::Connecting => self.medium,
            HealthStatus::Connected { .. } => self.low,
            HealthStatus::Disconnected => self.high,
        };
        Style::default().fg(color)
    }

    /// Highlight for the focused row.
    pub fn focus_style(self) -> Style {
        Style::default()
            .bg(self.accent)
            .fg(self.bg)
            .add_modifier(Modifier::BOLD)
    }
}
