//! Sortable, filterable result list with a keyboard focus state machine.
//!
//! The browser never mutates the [`ResultSet`]; it keeps a list of indices
//! into it (`visible`) in display order. Sorting always starts from the set's
//! original order with a stable sort, so records with equal keys keep their
//! original relative order no matter how many times the sort changes.

use std::cmp::Ordering;

use tokio::sync::watch;

use crate::model::types::{ResultRecord, ResultSet, RiskLevel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Id,
    RiskLevel,
    RiskScore,
    DelayProbability,
}

impl SortField {
    pub const ALL: [SortField; 4] = [
        SortField::Id,
        SortField::RiskLevel,
        SortField::RiskScore,
        SortField::DelayProbability,
    ];

    /// Ascending for the identifier, descending for numeric and severity keys.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortField::Id => SortDirection::Ascending,
            SortField::RiskLevel | SortField::RiskScore | SortField::DelayProbability => {
                SortDirection::Descending
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortField::Id => "task",
            SortField::RiskLevel => "level",
            SortField::RiskScore => "score",
            SortField::DelayProbability => "delay p",
        }
    }

    fn compare(self, a: &ResultRecord, b: &ResultRecord) -> Ordering {
        match self {
            SortField::Id => natural_id_cmp(&a.id, &b.id),
            SortField::RiskLevel => a.risk_level.rank().cmp(&b.risk_level.rank()),
            SortField::RiskScore => a.risk_score.cmp(&b.risk_score),
            SortField::DelayProbability => a.delay_probability.total_cmp(&b.delay_probability),
        }
    }
}

/// Order ids by their text prefix, then by a trailing number read as a
/// number, so `T2` sorts before `T10`. Ties fall back to the full text.
pub fn natural_id_cmp(a: &str, b: &str) -> Ordering {
    let (a_prefix, a_digits) = split_numeric_suffix(a);
    let (b_prefix, b_digits) = split_numeric_suffix(b);
    a_prefix
        .cmp(b_prefix)
        .then_with(|| a_digits.len().cmp(&b_digits.len()))
        .then_with(|| a_digits.cmp(b_digits))
        .then_with(|| a.cmp(b))
}

/// Split off trailing ASCII digits, with leading zeros dropped from the number.
fn split_numeric_suffix(id: &str) -> (&str, &str) {
    let prefix_len = id.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (prefix, digits) = id.split_at(prefix_len);
    (prefix, digits.trim_start_matches('0'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelFilter {
    All,
    Level(RiskLevel),
}

impl LevelFilter {
    pub fn matches(self, record: &ResultRecord) -> bool {
        match self {
            LevelFilter::All => true,
            LevelFilter::Level(level) => record.risk_level == level,
        }
    }

    /// `All -> High -> Medium -> Low -> All`.
    pub fn next(self) -> Self {
        match self {
            LevelFilter::All => LevelFilter::Level(RiskLevel::High),
            LevelFilter::Level(RiskLevel::High) => LevelFilter::Level(RiskLevel::Medium),
            LevelFilter::Level(RiskLevel::Medium) => LevelFilter::Level(RiskLevel::Low),
            LevelFilter::Level(RiskLevel::Low) => LevelFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LevelFilter::All => "all",
            LevelFilter::Level(level) => level.label(),
        }
    }
}

/// Keyboard focus over the visible rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    NoFocus,
    Focused(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserKey {
    Up,
    Down,
    Home,
    End,
    Enter,
    Escape,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowserEvent {
    /// A row was activated; carries the record id.
    Select(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrowserState {
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub filter: LevelFilter,
    pub focus: Focus,
    pub selected_id: Option<String>,
}

impl Default for BrowserState {
    fn default() -> Self {
        Self {
            sort_field: SortField::RiskScore,
            sort_direction: SortField::RiskScore.default_direction(),
            filter: LevelFilter::All,
            focus: Focus::NoFocus,
            selected_id: None,
        }
    }
}

/// Focus transition for one key over `len` visible rows.
pub fn next_focus(focus: Focus, key: BrowserKey, len: usize) -> Focus {
    if len == 0 {
        return Focus::NoFocus;
    }
    let last = len - 1;
    match (focus, key) {
        (Focus::NoFocus, BrowserKey::Down) => Focus::Focused(0),
        (Focus::Focused(i), BrowserKey::Down) => Focus::Focused((i + 1).min(last)),
        (Focus::Focused(i), BrowserKey::Up) => Focus::Focused(i.saturating_sub(1)),
        (Focus::NoFocus, BrowserKey::Up) => Focus::NoFocus,
        (_, BrowserKey::Home) => Focus::Focused(0),
        (_, BrowserKey::End) => Focus::Focused(last),
        (_, BrowserKey::Escape) => Focus::NoFocus,
        (focus, BrowserKey::Enter) => focus,
    }
}

pub struct ResultBrowser {
    data: ResultSet,
    visible: Vec<usize>,
    state: BrowserState,
    tx: watch::Sender<BrowserState>,
}

impl Default for ResultBrowser {
    fn default() -> Self {
        Self::new(ResultSet::empty())
    }
}

impl ResultBrowser {
    pub fn new(data: ResultSet) -> Self {
        let state = BrowserState::default();
        let (tx, _rx) = watch::channel(state.clone());
        let mut browser = Self {
            data,
            visible: Vec::new(),
            state,
            tx,
        };
        browser.recompute();
        browser
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<BrowserState> {
        self.tx.subscribe()
    }

    pub fn data(&self) -> &ResultSet {
        &self.data
    }

    /// Visible records in display order.
    pub fn visible(&self) -> Vec<&ResultRecord> {
        let records = self.data.records();
        self.visible.iter().map(|&i| &records[i]).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn focused_record(&self) -> Option<&ResultRecord> {
        match self.state.focus {
            Focus::NoFocus => None,
            Focus::Focused(i) => self
                .visible
                .get(i)
                .map(|&idx| &self.data.records()[idx]),
        }
    }

    /// The selected record, if it is still part of the current set.
    pub fn selected_record(&self) -> Option<&ResultRecord> {
        self.state
            .selected_id
            .as_deref()
            .and_then(|id| self.data.get(id))
    }

    /// Swap in a new result set. A handle to the same snapshot is a no-op.
    pub fn set_data(&mut self, data: ResultSet) {
        if self.data.same_snapshot(&data) {
            return;
        }
        self.data = data;
        self.recompute();
    }

    /// Same field toggles direction; a new field starts at its default direction.
    pub fn set_sort(&mut self, field: SortField) {
        if self.state.sort_field == field {
            self.state.sort_direction = self.state.sort_direction.toggle();
        } else {
            self.state.sort_field = field;
            self.state.sort_direction = field.default_direction();
        }
        self.recompute();
    }

    pub fn set_filter(&mut self, filter: LevelFilter) {
        self.state.filter = filter;
        self.recompute();
    }

    /// Apply one key. Returns an event when a row is activated.
    pub fn handle_key(&mut self, key: BrowserKey) -> Option<BrowserEvent> {
        let event = match (key, self.focused_record()) {
            (BrowserKey::Enter, Some(record)) => Some(BrowserEvent::Select(record.id.clone())),
            _ => None,
        };
        if let Some(BrowserEvent::Select(id)) = &event {
            self.state.selected_id = Some(id.clone());
        }
        self.state.focus = next_focus(self.state.focus, key, self.visible.len());
        self.publish();
        event
    }

    /// Explicit row activation (mouse click). Unknown ids are ignored.
    pub fn activate(&mut self, id: &str) -> Option<BrowserEvent> {
        self.data.get(id)?;
        self.state.selected_id = Some(id.to_string());
        self.publish();
        Some(BrowserEvent::Select(id.to_string()))
    }

    /// Clear the selection (detail view closed).
    pub fn close(&mut self) {
        self.state.selected_id = None;
        self.publish();
    }

    /// Rebuild the visible order and re-derive focus.
    ///
    /// Focus follows the focused record's id to its new position; if that
    /// record is no longer visible, focus is dropped rather than clamped.
    fn recompute(&mut self) {
        let focused_id = self.focused_record().map(|r| r.id.clone());

        let records = self.data.records();
        let filter = self.state.filter;
        let field = self.state.sort_field;
        let direction = self.state.sort_direction;

        let mut visible: Vec<usize> = (0..records.len())
            .filter(|&i| filter.matches(&records[i]))
            .collect();
        visible.sort_by(|&a, &b| {
            let ord = field.compare(&records[a], &records[b]);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });

        self.state.focus = focused_id
            .and_then(|id| visible.iter().position(|&i| records[i].id == id))
            .map_or(Focus::NoFocus, Focus::Focused);
        self.visible = visible;
        self.publish();
    }

    fn publish(&self) {
        let next = self.state.clone();
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
