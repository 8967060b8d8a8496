//! # Application Configuration
//!
//! Everything the enrollment wizard, the admin dashboard and the CLI read
//! from the environment. API connection settings are delegated to
//! [`ClientConfig`].
//!
//! ## Environment Variables
//!
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `BAYAN_SLOT_WINDOW`: `standard` (08:00-19:30 Cairo) or `full-day` (default: "standard")
//! - `BAYAN_OFFSET_RULE`: `heuristic` or `iana` (default: "heuristic")
//! - `BAYAN_PLAN_ORDER_FILE`: Where local plan order overrides are kept
//!   (default: ".bayan/plan-order.json")
//! - `BAYAN_ADMIN_TOKEN`: Admin JWT for the admin commands (optional)
//!
//! plus the variables documented in [`bayan_client::config`].

use std::{env, path::PathBuf};

use bayan_client::ClientConfig;
use bayan_core::{slots::WorkingHours, timezone::OffsetRule};
use eyre::{Result, eyre};
use tracing::Level;

pub const DEFAULT_PLAN_ORDER_FILE: &str = ".bayan/plan-order.json";

/// Which provider hours are offered for booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotWindow {
    #[default]
    Standard,
    FullDay,
}

impl SlotWindow {
    pub fn working_hours(self) -> WorkingHours {
        match self {
            SlotWindow::Standard => WorkingHours::standard(),
            SlotWindow::FullDay => WorkingHours::full_day(),
        }
    }
}

impl std::str::FromStr for SlotWindow {
    type Err = eyre::Report;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "standard" => Ok(SlotWindow::Standard),
            "full-day" | "full_day" | "fullday" => Ok(SlotWindow::FullDay),
            other => Err(eyre!(
                "Invalid BAYAN_SLOT_WINDOW value '{}', expected 'standard' or 'full-day'",
                other
            )),
        }
    }
}

/// Configuration shared by the wizard, the dashboard and the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Remote API settings
    pub client: ClientConfig,

    /// Log level for the application
    pub log_level: Level,

    pub slot_window: SlotWindow,

    pub offset_rule: OffsetRule,

    /// JSON file holding plan id to order overrides
    pub plan_order_file: PathBuf,

    /// Admin JWT used by the admin commands (optional)
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - any client setting is invalid (see [`ClientConfig::from_env`])
    /// - `BAYAN_SLOT_WINDOW` or `BAYAN_OFFSET_RULE` hold an unknown value
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = ClientConfig::from_lookup(&lookup)?;

        // Logging settings
        let log_level = match lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // Scheduling settings
        let slot_window = match lookup("BAYAN_SLOT_WINDOW") {
            Some(raw) => raw.parse()?,
            None => SlotWindow::default(),
        };
        let offset_rule = match lookup("BAYAN_OFFSET_RULE") {
            Some(raw) => raw
                .parse::<OffsetRule>()
                .map_err(|e| eyre!("Invalid BAYAN_OFFSET_RULE value: {}", e.user_message()))?,
            None => OffsetRule::default(),
        };

        let plan_order_file = lookup("BAYAN_PLAN_ORDER_FILE")
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAN_ORDER_FILE.to_string())
            .into();

        let admin_token = lookup("BAYAN_ADMIN_TOKEN").filter(|token| !token.trim().is_empty());

        Ok(Self {
            client,
            log_level,
            slot_window,
            offset_rule,
            plan_order_file,
            admin_token,
        })
    }

    pub fn working_hours(&self) -> WorkingHours {
        self.slot_window.working_hours()
    }
}
