//! Ratatui-based interface wired to the session orchestrator.
//!
//! [`App`] is the pure view state: it turns key presses and task completions
//! into [`Command`]s. The event loop executes commands on tokio and feeds
//! cache, health and invalidation changes back into the app.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::TestBackend;
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::ConsoleConfig;
use crate::health::{HealthMonitor, HealthSnapshot, poll_once};
use crate::model::types::{AggregateStats, HistoryEntry, ResultSet, RiskLevel, Scenario};
use crate::remote::{AnalysisRequest, HttpRemote, RemoteAccessor};
use crate::state::{ResultCache, SessionError, SessionOrchestrator};
use crate::ui::browser::{BrowserEvent, BrowserKey, Focus, LevelFilter, ResultBrowser, SortField};
use crate::ui::components::theme::ThemePalette;
use crate::ui::components::widgets::{health_badge, panel, risk_badge, stat_line};
use crate::ui::data::{Fetch, HistoryPanel, View, format_probability, history_row, stats_lines};
use crate::ui::inspector::DetailInspector;
use crate::ui::shortcuts;
use crate::ui::tween::NumericTween;

/// Side effects requested by the app.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    RunAnalysis(AnalysisRequest),
    LoadHistorical(i64),
    Clear,
    /// Refetch history entries and aggregate statistics.
    RefreshHistory,
    RecheckHealth,
    Quit,
}

/// Completions of background work.
#[derive(Debug)]
pub enum AppEvent {
    RunFinished(Result<ResultSet, SessionError>),
    HistoricalLoaded {
        id: i64,
        result: Result<ResultSet, SessionError>,
    },
    HistoryFetched(Result<Vec<HistoryEntry>, SessionError>),
    StatsFetched(Result<AggregateStats, SessionError>),
}

pub struct App {
    view: View,
    browser: ResultBrowser,
    inspector: Option<DetailInspector>,
    history: HistoryPanel,
    stats: Fetch<AggregateStats>,
    scenario: Option<Scenario>,
    health: HealthSnapshot,
    health_max_age: Duration,
    running: bool,
    status: String,
    show_help: bool,
    theme_dark: bool,
    total_tween: NumericTween,
    high_tween: NumericTween,
    mean_tween: NumericTween,
}

impl App {
    pub fn new(config: &ConsoleConfig) -> Self {
        let tween = |v| NumericTween::new(v, config.tween_duration);
        Self {
            view: View::Run,
            browser: ResultBrowser::default(),
            inspector: None,
            history: HistoryPanel::default(),
            stats: Fetch::Idle,
            scenario: None,
            health: HealthSnapshot::default(),
            health_max_age: config.health_max_age(),
            running: false,
            status: format!("Connecting to {} (F1 help)", config.api_url),
            show_help: false,
            theme_dark: true,
            total_tween: tween(0.0),
            high_tween: tween(0.0),
            mean_tween: tween(0.0),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn browser(&self) -> &ResultBrowser {
        &self.browser
    }

    pub fn inspector(&self) -> Option<&DetailInspector> {
        self.inspector.as_ref()
    }

    pub fn history(&self) -> &HistoryPanel {
        &self.history
    }

    pub fn scenario(&self) -> Option<Scenario> {
        self.scenario
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Why a run cannot start right now, if it cannot.
    pub fn run_blocker(&self) -> Option<&'static str> {
        if self.running {
            Some("an analysis is already running")
        } else if !self.health.is_connected() {
            Some("backend is not connected")
        } else if self.health.is_stale(self.health_max_age) {
            Some("backend status is stale")
        } else {
            None
        }
    }

    pub fn on_health(&mut self, snapshot: HealthSnapshot) {
        self.health = snapshot;
    }

    /// The cache published a new current set.
    pub fn on_result_set(&mut self, set: ResultSet, now: Instant) {
        self.total_tween.set_target(set.len() as f64, now);
        self.high_tween.set_target(set.counts().high as f64, now);
        self.mean_tween.set_target(set.mean_score(), now);
        self.browser.set_data(set);
        self.sync_inspector();
    }

    pub fn on_event(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::RunFinished(Ok(set)) => {
                self.running = false;
                self.history.loaded_id = None;
                self.status = format!(
                    "Analysis complete: {} tasks, {} high risk",
                    set.len(),
                    set.counts().high
                );
                self.view = View::Results;
            }
            AppEvent::RunFinished(Err(SessionError::RunInFlight)) => {
                self.status = SessionError::RunInFlight.user_message();
            }
            AppEvent::RunFinished(Err(err)) => {
                self.running = false;
                self.status = err.user_message();
            }
            AppEvent::HistoricalLoaded { id, result: Ok(set) } => {
                self.history.loaded_id = Some(id);
                self.status = format!("Loaded analysis #{id}: {} tasks", set.len());
                self.view = View::Results;
            }
            AppEvent::HistoricalLoaded { id, result: Err(err) } => {
                self.status = format!("Analysis #{id}: {}", err.user_message());
            }
            AppEvent::HistoryFetched(Ok(entries)) => self.history.set_entries(entries),
            AppEvent::HistoryFetched(Err(err)) => {
                self.history.entries = Fetch::Failed(err.user_message());
            }
            AppEvent::StatsFetched(Ok(stats)) => self.stats = Fetch::Loaded(stats),
            AppEvent::StatsFetched(Err(err)) => self.stats = Fetch::Failed(err.user_message()),
        }
        Vec::new()
    }

    /// A successful run invalidated history and statistics.
    pub fn on_invalidated(&mut self) -> Vec<Command> {
        self.begin_history_refresh()
    }

    fn begin_history_refresh(&mut self) -> Vec<Command> {
        self.history.entries = Fetch::Loading;
        self.stats = Fetch::Loading;
        vec![Command::RefreshHistory]
    }

    /// Advance animations; true while any is still moving.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.total_tween.sample(now);
        self.high_tween.sample(now);
        self.mean_tween.sample(now);
        self.total_tween.is_animating()
            || self.high_tween.is_animating()
            || self.mean_tween.is_animating()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Command> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Command::Quit];
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
                self.show_help = false;
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::F(1) => self.show_help = true,
            KeyCode::F(2) => self.theme_dark = !self.theme_dark,
            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::Char('1') => self.view = View::Run,
            KeyCode::Char('2') => self.view = View::Results,
            KeyCode::Char('3') => self.view = View::History,
            KeyCode::Char('q') => return vec![Command::Quit],
            KeyCode::Char('h') => {
                self.status = "Rechecking backend health…".to_string();
                return vec![Command::RecheckHealth];
            }
            KeyCode::Char('s') => {
                self.scenario = Scenario::cycle(self.scenario);
                self.status = match self.scenario {
                    Some(sc) => format!("Scenario: {} - {}", sc.id(), sc.description()),
                    None => "Scenario: baseline (no what-if)".to_string(),
                };
            }
            KeyCode::Char('r') => return self.request_run(false),
            KeyCode::Char('R') => return self.request_run(true),
            KeyCode::Char('C') => {
                self.history.loaded_id = None;
                self.status = "Results cleared".to_string();
                return vec![Command::Clear];
            }
            _ => {
                return match self.view {
                    View::Run => Vec::new(),
                    View::Results => {
                        self.handle_results_key(key);
                        Vec::new()
                    }
                    View::History => self.handle_history_key(key),
                };
            }
        }
        Vec::new()
    }

    fn request_run(&mut self, refresh: bool) -> Vec<Command> {
        if let Some(reason) = self.run_blocker() {
            self.status = format!("Cannot run: {reason}");
            return Vec::new();
        }
        self.running = true;
        self.status = if refresh {
            "Retraining and running analysis…".to_string()
        } else {
            "Running analysis…".to_string()
        };
        vec![Command::RunAnalysis(AnalysisRequest {
            scenario: self.scenario,
            refresh,
        })]
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let browser_key = match key.code {
            KeyCode::Up => Some(BrowserKey::Up),
            KeyCode::Down => Some(BrowserKey::Down),
            KeyCode::Home => Some(BrowserKey::Home),
            KeyCode::End => Some(BrowserKey::End),
            KeyCode::Enter => Some(BrowserKey::Enter),
            KeyCode::Esc => Some(BrowserKey::Escape),
            _ => None,
        };
        if let Some(bk) = browser_key {
            if let Some(BrowserEvent::Select(id)) = self.browser.handle_key(bk) {
                debug!(task = %id, "result selected");
            }
            self.sync_inspector();
            return;
        }

        match key.code {
            KeyCode::Char('t') => self.browser.set_sort(SortField::Id),
            KeyCode::Char('v') => self.browser.set_sort(SortField::RiskLevel),
            KeyCode::Char('n') => self.browser.set_sort(SortField::RiskScore),
            KeyCode::Char('d') => self.browser.set_sort(SortField::DelayProbability),
            KeyCode::Char('f') => {
                let next = self.browser.state().filter.next();
                self.browser.set_filter(next);
            }
            KeyCode::Char('a') => self.browser.set_filter(LevelFilter::All),
            KeyCode::Char('x') => {
                self.browser.close();
                self.sync_inspector();
            }
            KeyCode::Char('[') => {
                if let Some(inspector) = self.inspector.as_mut() {
                    inspector.toggle_reasons();
                }
            }
            KeyCode::Char(']') => {
                if let Some(inspector) = self.inspector.as_mut() {
                    inspector.toggle_actions();
                }
            }
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) -> Vec<Command> {
        match key.code {
            KeyCode::Up => self.history.move_cursor(-1),
            KeyCode::Down => self.history.move_cursor(1),
            KeyCode::Home => self.history.cursor = 0,
            KeyCode::End => self.history.move_cursor(isize::MAX / 2),
            KeyCode::Enter => {
                if let Some(entry) = self.history.current() {
                    let id = entry.id;
                    self.status = format!("Loading analysis #{id}…");
                    return vec![Command::LoadHistorical(id)];
                }
            }
            KeyCode::Char('g') => {
                self.status = "Refreshing history…".to_string();
                return self.begin_history_refresh();
            }
            _ => {}
        }
        Vec::new()
    }

    /// Keep the inspector in step with the browser's selection.
    ///
    /// Collapse state survives as long as the same record stays selected.
    fn sync_inspector(&mut self) {
        match self.browser.selected_record() {
            None => self.inspector = None,
            Some(record) => {
                let same = self
                    .inspector
                    .as_ref()
                    .is_some_and(|inspector| inspector.record() == record);
                if !same {
                    self.inspector = Some(DetailInspector::new(record.clone()));
                }
            }
        }
    }

    fn palette(&self) -> ThemePalette {
        if self.theme_dark {
            ThemePalette::dark()
        } else {
            ThemePalette::light()
        }
    }
}

pub fn footer_legend(view: View) -> String {
    let common = format!(
        "{} help | {} view | {} run | {} scenario | {} quit",
        shortcuts::HELP,
        shortcuts::NEXT_VIEW,
        shortcuts::RUN,
        shortcuts::CYCLE_SCENARIO,
        shortcuts::QUIT
    );
    let specific = match view {
        View::Run => format!(
            "{} retrain+run | {} recheck health | {} clear",
            shortcuts::RUN_REFRESH,
            shortcuts::RECHECK_HEALTH,
            shortcuts::CLEAR_RESULTS
        ),
        View::Results => format!(
            "{} move | {} open | {} unfocus | {} close | {}/{}/{}/{} sort | {} filter",
            shortcuts::NAV,
            shortcuts::DETAIL_OPEN,
            shortcuts::FOCUS_CLEAR,
            shortcuts::DETAIL_CLOSE,
            shortcuts::SORT_TASK,
            shortcuts::SORT_LEVEL,
            shortcuts::SORT_SCORE,
            shortcuts::SORT_DELAY,
            shortcuts::CYCLE_FILTER
        ),
        View::History => format!(
            "{} move | {} load | {} refresh",
            shortcuts::NAV,
            shortcuts::HISTORY_LOAD,
            shortcuts::HISTORY_REFRESH
        ),
    };
    format!("{specific} • {common}")
}

fn help_lines(palette: ThemePalette) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    let mut add_section = |title: &str, items: &[String]| {
        lines.push(Line::from(Span::styled(title.to_string(), palette.title())));
        for item in items {
            lines.push(Line::from(format!("  {item}")));
        }
        lines.push(Line::from(""));
    };

    add_section(
        "Run",
        &[
            format!(
                "{} run analysis; {} retrain first; {} cycles what-if scenario",
                shortcuts::RUN,
                shortcuts::RUN_REFRESH,
                shortcuts::CYCLE_SCENARIO
            ),
            "runs are disabled until the backend reports connected".to_string(),
            format!(
                "{} recheck health now; {} clear current results",
                shortcuts::RECHECK_HEALTH,
                shortcuts::CLEAR_RESULTS
            ),
        ],
    );
    add_section(
        "Results",
        &[
            format!(
                "{} focus rows; {}/{} jump; {} open detail; {} drop focus",
                shortcuts::NAV,
                shortcuts::JUMP_TOP,
                shortcuts::JUMP_BOTTOM,
                shortcuts::DETAIL_OPEN,
                shortcuts::FOCUS_CLEAR
            ),
            format!(
                "sort: {} task, {} level, {} score, {} delay (again to reverse)",
                shortcuts::SORT_TASK,
                shortcuts::SORT_LEVEL,
                shortcuts::SORT_SCORE,
                shortcuts::SORT_DELAY
            ),
            format!(
                "{} cycle level filter; {} show all",
                shortcuts::CYCLE_FILTER,
                shortcuts::FILTER_ALL
            ),
            format!(
                "{} close detail; {} / {} collapse reasons / actions",
                shortcuts::DETAIL_CLOSE,
                shortcuts::TOGGLE_REASONS,
                shortcuts::TOGGLE_ACTIONS
            ),
        ],
    );
    add_section(
        "History",
        &[format!(
            "{} pick a past analysis; {} load it; {} refresh list",
            shortcuts::NAV,
            shortcuts::HISTORY_LOAD,
            shortcuts::HISTORY_REFRESH
        )],
    );
    add_section(
        "General",
        &[format!(
            "{} switch view ({} direct); {} theme; {} toggle help; {} quit",
            shortcuts::NEXT_VIEW,
            shortcuts::VIEW_KEYS,
            shortcuts::THEME,
            shortcuts::HELP,
            shortcuts::QUIT
        )],
    );

    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

pub fn draw(frame: &mut Frame, app: &App) {
    let palette = app.palette();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs + health
            Constraint::Min(0),    // body
            Constraint::Length(1), // status
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    let stale = app.health.is_stale(app.health_max_age);
    let tabs = Tabs::new(View::ALL.iter().map(|v| v.title()).collect::<Vec<_>>())
        .select(app.view.index())
        .highlight_style(palette.title())
        .block(panel("risk-console".to_string(), false, palette).title_bottom(
            Line::from(health_badge(&app.health, stale, palette)).right_aligned(),
        ));
    frame.render_widget(tabs, chunks[0]);

    match app.view {
        View::Run => draw_run(frame, app, chunks[1], palette),
        View::Results => draw_results(frame, app, chunks[1], palette),
        View::History => draw_history(frame, app, chunks[1], palette),
    }

    let status_style = if app.running {
        Style::default().fg(palette.medium)
    } else {
        Style::default().fg(palette.fg)
    };
    frame.render_widget(
        Paragraph::new(Span::styled(app.status.clone(), status_style)),
        chunks[2],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(footer_legend(app.view), palette.hint_style())),
        chunks[3],
    );

    if app.show_help {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(help_lines(palette))
                .block(panel("Help / Shortcuts".to_string(), true, palette))
                .wrap(Wrap { trim: true }),
            area,
        );
    }
}

fn draw_run(frame: &mut Frame, app: &App, area: Rect, palette: ThemePalette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let mut scenario_lines = Vec::new();
    let options: Vec<Option<Scenario>> = std::iter::once(None)
        .chain(Scenario::ALL.into_iter().map(Some))
        .collect();
    for option in options {
        let active = option == app.scenario;
        let (name, description) = match option {
            Some(sc) => (sc.id(), sc.description()),
            None => ("baseline", "Current plan, no intervention"),
        };
        let marker = if active { "▶" } else { " " };
        let style = if active {
            palette.title()
        } else {
            Style::default().fg(palette.fg)
        };
        scenario_lines.push(Line::from(Span::styled(format!("{marker} {name}"), style)));
        scenario_lines.push(Line::from(Span::styled(
            format!("    {description}"),
            palette.hint_style(),
        )));
    }
    scenario_lines.push(Line::from(""));
    scenario_lines.push(match app.run_blocker() {
        Some(reason) => Line::from(Span::styled(
            format!("run disabled: {reason}"),
            Style::default().fg(palette.high),
        )),
        None => Line::from(Span::styled(
            format!("press {} to run", shortcuts::RUN),
            Style::default().fg(palette.low),
        )),
    });
    frame.render_widget(
        Paragraph::new(scenario_lines).block(panel("Scenario".to_string(), true, palette)),
        columns[0],
    );

    let counts = app.browser.data().counts();
    let mut summary = vec![
        stat_line(
            "tasks",
            format!("{:.0}", app.total_tween.displayed()),
            palette,
        ),
        stat_line(
            "high risk",
            format!("{:.0}", app.high_tween.displayed()),
            palette,
        ),
        stat_line(
            "mean score",
            format!("{:.1}", app.mean_tween.displayed()),
            palette,
        ),
        Line::from(
            RiskLevel::ALL
                .iter()
                .flat_map(|&level| {
                    [
                        risk_badge(level, palette),
                        Span::raw(format!("{:<5}", counts.get(level))),
                    ]
                })
                .collect::<Vec<_>>(),
        ),
        Line::from(""),
        Line::from(Span::styled("All analyses", palette.title())),
    ];
    match &app.stats {
        Fetch::Loaded(stats) => {
            summary.extend(stats_lines(stats).into_iter().map(Line::from));
        }
        Fetch::Loading => summary.push(Line::from(Span::styled("loading…", palette.hint_style()))),
        Fetch::Failed(msg) => summary.push(Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(palette.high),
        ))),
        Fetch::Idle => summary.push(Line::from(Span::styled("not loaded", palette.hint_style()))),
    }
    frame.render_widget(
        Paragraph::new(summary).block(panel("Current results".to_string(), false, palette)),
        columns[1],
    );
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect, palette: ThemePalette) {
    let (table_area, detail_area) = if app.inspector.is_some() {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        (split[0], Some(split[1]))
    } else {
        (area, None)
    };

    let state = app.browser.state();
    let header_cell = |field: SortField| {
        let label = if state.sort_field == field {
            format!("{} {}", field.label(), state.sort_direction.arrow())
        } else {
            field.label().to_string()
        };
        Cell::from(label)
    };
    let header = Row::new(vec![
        Cell::from(" "),
        header_cell(SortField::Id),
        header_cell(SortField::RiskLevel),
        header_cell(SortField::RiskScore),
        header_cell(SortField::DelayProbability),
        Cell::from("what-if"),
    ])
    .style(palette.title());

    let selected = state.selected_id.as_deref();
    let rows: Vec<Row> = app
        .browser
        .visible()
        .into_iter()
        .map(|record| {
            let marker = if selected == Some(record.id.as_str()) {
                "●"
            } else {
                " "
            };
            let what_if = record
                .counterfactual
                .as_ref()
                .map(|cf| format_probability(cf.new_delay_probability))
                .unwrap_or_default();
            Row::new(vec![
                Cell::from(marker),
                Cell::from(record.id.clone()),
                Cell::from(Line::from(risk_badge(record.risk_level, palette))),
                Cell::from(record.risk_score.to_string()),
                Cell::from(format_probability(record.delay_probability)),
                Cell::from(what_if),
            ])
        })
        .collect();

    let title = format!(
        "Results {}/{} • filter {} • sort {}{}",
        app.browser.visible_len(),
        app.browser.data().len(),
        state.filter.label(),
        state.sort_field.label(),
        state.sort_direction.arrow()
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(panel(title, detail_area.is_none(), palette))
    .row_highlight_style(palette.focus_style());

    let mut table_state = TableState::default();
    if let Focus::Focused(i) = state.focus {
        table_state.select(Some(i));
    }
    if app.browser.data().is_empty() {
        frame.render_widget(
            Paragraph::new(vec![
                Line::from("No results loaded."),
                Line::from(Span::styled(
                    format!(
                        "Press {} to run an analysis or load one from History.",
                        shortcuts::RUN
                    ),
                    palette.hint_style(),
                )),
            ])
            .block(panel("Results".to_string(), true, palette)),
            table_area,
        );
    } else {
        frame.render_stateful_widget(table, table_area, &mut table_state);
    }

    if let (Some(inspector), Some(area)) = (app.inspector.as_ref(), detail_area) {
        draw_detail(frame, inspector, area, palette);
    }
}

fn draw_detail(frame: &mut Frame, inspector: &DetailInspector, area: Rect, palette: ThemePalette) {
    let record = inspector.record();
    let mut lines = vec![Line::from(vec![
        risk_badge(record.risk_level, palette),
        Span::raw(format!(
            " score {}  delay {}",
            record.risk_score,
            format_probability(record.delay_probability)
        )),
    ])];

    if let Some(driver) = inspector.primary_driver() {
        lines.push(Line::from(Span::styled(
            format!("▲ primary driver: {}", driver.text),
            palette.severity_style(driver.severity).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));

    let fold = |expanded: bool| if expanded { "▾" } else { "▸" };
    lines.push(Line::from(Span::styled(
        format!(
            "{} Reasons ({})",
            fold(inspector.reasons_expanded()),
            inspector.reasons().len()
        ),
        palette.title(),
    )));
    if inspector.reasons_expanded() {
        for reason in inspector.reasons() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<9}", reason.severity.label()),
                    palette.severity_style(reason.severity),
                ),
                Span::raw(reason.text.clone()),
            ]));
        }
    }

    lines.push(Line::from(Span::styled(
        format!(
            "{} Actions ({})",
            fold(inspector.actions_expanded()),
            inspector.actions().len()
        ),
        palette.title(),
    )));
    if inspector.actions_expanded() {
        for action in inspector.actions() {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  [{}] ", action.priority.label()),
                    palette.priority_style(action.priority),
                ),
                Span::raw(action.text.clone()),
            ]));
        }
    }

    if let Some(cf) = inspector.counterfactual() {
        lines.push(Line::from(""));
        let scenario = cf.scenario.map_or("what-if", |s| s.id());
        let style = if cf.significant {
            Style::default().fg(palette.low).add_modifier(Modifier::BOLD)
        } else {
            palette.hint_style()
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{scenario}: {} → {} (−{:.1} pts){}",
                format_probability(cf.baseline_probability),
                format_probability(cf.new_delay_probability),
                cf.reduction_percent,
                if cf.significant { " significant" } else { "" }
            ),
            style,
        )));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .block(panel(record.id.clone(), true, palette))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_history(frame: &mut Frame, app: &App, area: Rect, palette: ThemePalette) {
    let title = match app.history.loaded_id {
        Some(id) => format!("History • showing #{id}"),
        None => "History".to_string(),
    };
    let block = panel(title, true, palette);
    match &app.history.entries {
        Fetch::Loaded(entries) if !entries.is_empty() => {
            let items: Vec<ListItem> = entries
                .iter()
                .map(|entry| {
                    let style = if app.history.loaded_id == Some(entry.id) {
                        Style::default().fg(palette.accent)
                    } else {
                        Style::default().fg(palette.fg)
                    };
                    ListItem::new(Span::styled(history_row(entry), style))
                })
                .collect();
            let mut state = ListState::default();
            state.select(Some(app.history.cursor));
            frame.render_stateful_widget(
                List::new(items)
                    .block(block)
                    .highlight_style(palette.focus_style()),
                area,
                &mut state,
            );
        }
        other => {
            let text = match other {
                Fetch::Loading => "Loading history…".to_string(),
                Fetch::Failed(msg) => msg.clone(),
                Fetch::Idle => format!("Press {} to load history.", shortcuts::HISTORY_REFRESH),
                Fetch::Loaded(_) => "No analyses recorded yet.".to_string(),
            };
            frame.render_widget(Paragraph::new(text).block(block), area);
        }
    }
}

/// Render one frame off-screen and return its text, row by row.
pub fn render_text(app: &App, width: u16, height: u16) -> Result<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(|f| draw(f, app))?;
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}

fn dispatch<A: RemoteAccessor>(
    command: Command,
    session: &Arc<SessionOrchestrator<A>>,
    monitor: &HealthMonitor,
    tx: &mpsc::UnboundedSender<AppEvent>,
    tasks: &mut JoinSet<()>,
    history_limit: usize,
) {
    match command {
        Command::RunAnalysis(request) => {
            let session = Arc::clone(session);
            let tx = tx.clone();
            tasks.spawn(async move {
                let result = session.run_analysis(request).await;
                let _ = tx.send(AppEvent::RunFinished(result));
            });
        }
        Command::LoadHistorical(id) => {
            let session = Arc::clone(session);
            let tx = tx.clone();
            tasks.spawn(async move {
                let result = session.load_historical(id).await;
                let _ = tx.send(AppEvent::HistoricalLoaded { id, result });
            });
        }
        Command::Clear => session.clear(),
        Command::RefreshHistory => {
            let history_session = Arc::clone(session);
            let history_tx = tx.clone();
            tasks.spawn(async move {
                let result = history_session.fetch_history(history_limit).await;
                let _ = history_tx.send(AppEvent::HistoryFetched(result));
            });
            let session = Arc::clone(session);
            let tx = tx.clone();
            tasks.spawn(async move {
                let result = session.fetch_stats().await;
                let _ = tx.send(AppEvent::StatsFetched(result));
            });
        }
        Command::RecheckHealth => monitor.refresh_now(),
        Command::Quit => {}
    }
}

pub async fn run_tui(config: ConsoleConfig, once: bool) -> Result<()> {
    if once
        && std::env::var("TUI_HEADLESS")
            .map(|v| v == "1")
            .unwrap_or(false)
    {
        return run_tui_headless(config).await;
    }

    let remote = HttpRemote::new(&config).context("creating backend client")?;
    let cache = Arc::new(ResultCache::new());
    let session = Arc::new(SessionOrchestrator::new(remote.clone(), Arc::clone(&cache)));
    let monitor = HealthMonitor::spawn(
        Arc::new(remote),
        config.health_interval,
        config.health_attempts,
    );

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(api = %config.api_url, "console started");
    let outcome = event_loop(&mut terminal, &config, &cache, &session, &monitor, once).await;
    teardown_terminal()?;
    outcome
}

async fn event_loop<A: RemoteAccessor>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: &ConsoleConfig,
    cache: &ResultCache,
    session: &Arc<SessionOrchestrator<A>>,
    monitor: &HealthMonitor,
    once: bool,
) -> Result<()> {
    let mut app = App::new(config);
    let mut results_rx = cache.subscribe();
    let mut health_rx = monitor.subscribe();
    let mut invalidations_rx = session.subscribe_invalidations();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();
    let tick_rate = Duration::from_millis(30);
    let mut needs_draw = true;

    for command in app.on_invalidated() {
        dispatch(command, session, monitor, &tx, &mut tasks, config.history_limit);
    }

    loop {
        if app.tick(Instant::now()) {
            needs_draw = true;
        }
        if needs_draw {
            terminal.draw(|f| draw(f, &app))?;
            needs_draw = false;
            if once {
                break;
            }
        }

        let mut commands = Vec::new();
        if tokio::task::block_in_place(|| event::poll(tick_rate))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            needs_draw = true;
            commands.extend(app.handle_key(key));
        }

        while let Ok(event) = rx.try_recv() {
            needs_draw = true;
            commands.extend(app.on_event(event));
        }

        if results_rx.has_changed().unwrap_or(false) {
            let set = results_rx.borrow_and_update().clone();
            app.on_result_set(set, Instant::now());
            needs_draw = true;
        }
        if health_rx.has_changed().unwrap_or(false) {
            app.on_health(health_rx.borrow_and_update().clone());
            needs_draw = true;
        }
        if invalidations_rx.has_changed().unwrap_or(false) {
            invalidations_rx.mark_unchanged();
            commands.extend(app.on_invalidated());
        }

        for command in commands {
            if command == Command::Quit {
                info!("quit requested");
                return Ok(());
            }
            dispatch(command, session, monitor, &tx, &mut tasks, config.history_limit);
        }
        while tasks.try_join_next().is_some() {}
    }
    Ok(())
}

async fn run_tui_headless(config: ConsoleConfig) -> Result<()> {
    let remote = HttpRemote::new(&config).context("creating backend client")?;
    let status = poll_once(&remote, config.health_attempts).await;
    let mut app = App::new(&config);
    app.on_health(HealthSnapshot {
        status,
        resolved_at: Some(tokio::time::Instant::now()),
    });
    let frame = render_text(&app, 120, 40)?;
    debug!(bytes = frame.len(), "headless frame rendered");
    print!("{frame}");
    Ok(())
}

fn teardown_terminal() -> Result<()> {
    let mut stdout = io::stdout();
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthStatus;
    use crate::model::types::ResultRecord;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn connected() -> HealthSnapshot {
        HealthSnapshot {
            status: HealthStatus::Connected {
                version: "2.1.0".into(),
            },
            resolved_at: Some(tokio::time::Instant::now()),
        }
    }

    fn record(id: &str, level: RiskLevel, score: u8) -> ResultRecord {
        ResultRecord {
            id: id.into(),
            risk_level: level,
            risk_score: score,
            delay_probability: 0.5,
            reasons: vec!["Frequent task blocking (3+ events)".into()],
            recommended_actions: vec!["[HIGH] Allocate additional resources".into()],
            counterfactual: None,
        }
    }

    #[test]
    fn run_is_blocked_until_connected() {
        let mut app = App::new(&ConsoleConfig::default());
        assert!(app.handle_key(key(KeyCode::Char('r'))).is_empty());
        assert!(app.status().contains("not connected"));

        app.on_health(connected());
        let commands = app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(
            commands,
            vec![Command::RunAnalysis(AnalysisRequest::default())]
        );
        assert!(app.is_running());
        assert!(app.handle_key(key(KeyCode::Char('r'))).is_empty());
    }

    #[test]
    fn scenario_cycle_feeds_run_request() {
        let mut app = App::new(&ConsoleConfig::default());
        app.on_health(connected());
        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.scenario(), Some(Scenario::AddResource));
        let commands = app.handle_key(key(KeyCode::Char('R')));
        assert_eq!(
            commands,
            vec![Command::RunAnalysis(AnalysisRequest {
                scenario: Some(Scenario::AddResource),
                refresh: true,
            })]
        );
    }

    #[test]
    fn failed_run_reports_and_rearms() {
        let mut app = App::new(&ConsoleConfig::default());
        app.on_health(connected());
        app.handle_key(key(KeyCode::Char('r')));
        app.on_event(AppEvent::RunFinished(Err(SessionError::Remote(
            crate::remote::RemoteError::RateLimited {
                detail: String::new(),
            },
        ))));
        assert!(!app.is_running());
        assert!(app.status().contains("Rate limit"));
    }

    #[test]
    fn enter_on_results_opens_inspector_and_x_closes() {
        let mut app = App::new(&ConsoleConfig::default());
        app.on_result_set(
            ResultSet::new(vec![
                record("T1", RiskLevel::High, 80),
                record("T2", RiskLevel::Low, 10),
            ]),
            Instant::now(),
        );
        app.handle_key(key(KeyCode::Char('2')));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.browser().state().selected_id.as_deref(), Some("T1"));
        assert_eq!(app.inspector().map(|i| i.record().id.as_str()), Some("T1"));

        app.handle_key(key(KeyCode::Char('[')));
        assert!(!app.inspector().unwrap().reasons_expanded());
        app.handle_key(key(KeyCode::Char('n')));
        assert!(!app.inspector().unwrap().reasons_expanded());

        app.handle_key(key(KeyCode::Char('x')));
        assert!(app.inspector().is_none());
    }

    #[test]
    fn history_enter_requests_load() {
        let mut app = App::new(&ConsoleConfig::default());
        app.handle_key(key(KeyCode::Char('3')));
        app.on_event(AppEvent::HistoryFetched(Ok(vec![HistoryEntry {
            id: 7,
            scenario: None,
            model_type: None,
            num_tasks: 2,
            high_risk_count: 1,
            medium_risk_count: 1,
            low_risk_count: 0,
            created_at: None,
        }])));
        assert_eq!(
            app.handle_key(key(KeyCode::Enter)),
            vec![Command::LoadHistorical(7)]
        );
        app.on_event(AppEvent::HistoricalLoaded {
            id: 7,
            result: Ok(ResultSet::empty()),
        });
        assert_eq!(app.history().loaded_id, Some(7));
        assert_eq!(app.view(), View::Results);
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut app = App::new(&ConsoleConfig::default());
        app.handle_key(key(KeyCode::F(1)));
        assert!(app.handle_key(key(KeyCode::Char('q'))).is_empty());
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), vec![Command::Quit]);
    }

    #[test]
    fn renders_results_table_with_detail() {
        let mut app = App::new(&ConsoleConfig::default());
        app.on_result_set(
            ResultSet::new(vec![record("TASK-42", RiskLevel::High, 91)]),
            Instant::now(),
        );
        app.handle_key(key(KeyCode::Char('2')));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        let text = render_text(&app, 140, 30).unwrap();
        assert!(text.contains("TASK-42"));
        assert!(text.contains("primary driver"));
        assert!(text.contains("[HIGH]"));
    }
}
