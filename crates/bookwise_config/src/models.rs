
use serde::{Deserialize, Serialize};

// --- Booking Page API Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String, // e.g., loaded via BOOKWISE__API__BASE_URL
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// How visitor-local slot labels are rendered.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// `14:30`
    #[default]
    TwentyFourHour,
    /// `2:30 PM`
    TwelveHour,
}

// --- Widget Behaviour Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WidgetConfig {
    /// Lookahead used when a call type has no (or a zero) `max_days_ahead`.
    #[serde(default = "default_max_days_ahead")]
    pub default_max_days_ahead: u32,
    /// IANA zone the visitor sees times in. Injected, never detected.
    #[serde(default)]
    pub visitor_time_zone: Option<String>,
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default = "default_true")]
    pub auto_select_first_date: bool,
    /// Length of the first visible range loaded on mount.
    #[serde(default = "default_initial_range_days")]
    pub initial_range_days: u32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            default_max_days_ahead: default_max_days_ahead(),
            visitor_time_zone: None,
            time_format: TimeFormat::default(),
            auto_select_first_date: true,
            initial_range_days: default_initial_range_days(),
        }
    }
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>, // "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default)]
    pub directory: Option<String>, // enables the rolling file appender
    #[serde(default)]
    pub file_prefix: Option<String>,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // API config is mandatory
    pub api: ApiConfig,

    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_days_ahead() -> u32 {
    60
}

fn default_initial_range_days() -> u32 {
    35
}

fn default_true() -> bool {
    true
}
