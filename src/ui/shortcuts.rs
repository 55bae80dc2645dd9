//! Keyboard shortcut labels for help and footer text.

pub const HELP: &str = "F1";
pub const THEME: &str = "F2";
pub const QUIT: &str = "q/Ctrl+C";
pub const NEXT_VIEW: &str = "Tab";
pub const VIEW_KEYS: &str = "1/2/3";

// Run screen
pub const RUN: &str = "r";
pub const RUN_REFRESH: &str = "R";
pub const CYCLE_SCENARIO: &str = "s";
pub const RECHECK_HEALTH: &str = "h";
pub const CLEAR_RESULTS: &str = "C";

// Results screen
pub const SORT_TASK: &str = "t";
pub const SORT_LEVEL: &str = "v";
pub const SORT_SCORE: &str = "n";
pub const SORT_DELAY: &str = "d";
pub const CYCLE_FILTER: &str = "f";
pub const FILTER_ALL: &str = "a";
pub const DETAIL_OPEN: &str = "Enter";
pub const FOCUS_CLEAR: &str = "Esc";
pub const DETAIL_CLOSE: &str = "x";
pub const TOGGLE_REASONS: &str = "[";
pub const TOGGLE_ACTIONS: &str = "]";

// History screen
pub const HISTORY_LOAD: &str = "Enter";
pub const HISTORY_REFRESH: &str = "g";

// Navigation
pub const NAV: &str = "↑/↓";
pub const JUMP_TOP: &str = "Home";
pub const JUMP_BOTTOM: &str = "End";
