//! Error types for the SpinDrip core
//!
//! Every failure the core can surface is local and recoverable: a rejected
//! wager, a ledger refusal, or a configuration defect caught at startup.

use crate::money::Money;
use std::fmt;

/// Root error type for all SpinDrip operations
#[derive(Debug)]
pub enum SpinDripError {
    /// Configuration and catalog defects
    Configuration(ConfigurationError),

    /// Wagers rejected before the orchestrator accepts them
    Wager(WagerError),

    /// Balance ledger refusals
    Ledger(LedgerError),

    /// Background task failures
    Scheduler(SchedulerError),
}

/// Configuration and validation errors
#[derive(Debug)]
pub enum ConfigurationError {
    ValidationFailed(String),
    MissingRequired(String),
    InvalidValue { field: String, value: String, reason: String },
    LoadFailed(String),
    SaveFailed(String),
    UnknownTheme(String),
    /// The loss-tier resample loop ran out of retries
    SymbolSetTooSmall { theme: String, retries: u32 },
}

/// Wager rejections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WagerError {
    InvalidBet { bet: Money, reason: String },
    AlreadyInFlight,
}

/// Ledger refusals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    InsufficientFunds { requested: Money, available: Money },
    Overflow { balance: Money, amount: Money },
    /// `bet × multiplier` does not fit in a money amount
    PayoutOverflow { bet: Money, multiplier: u64 },
}

/// Background task errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A spawned task panicked or was torn down before finishing
    TaskFailed { task: String, reason: String },
}

impl SpinDripError {
    /// True when the error is a funds shortfall
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, SpinDripError::Ledger(LedgerError::InsufficientFunds { .. }))
    }

    /// True when a spin was already mid-flight
    pub fn is_already_in_flight(&self) -> bool {
        matches!(self, SpinDripError::Wager(WagerError::AlreadyInFlight))
    }

    pub fn is_invalid_bet(&self) -> bool {
        matches!(self, SpinDripError::Wager(WagerError::InvalidBet { .. }))
    }
}

impl fmt::Display for SpinDripError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinDripError::Configuration(e) => write!(f, "Configuration error: {}", e),
            SpinDripError::Wager(e) => write!(f, "Wager rejected: {}", e),
            SpinDripError::Ledger(e) => write!(f, "Ledger error: {}", e),
            SpinDripError::Scheduler(e) => write!(f, "Scheduler error: {}", e),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ValidationFailed(msg) => write!(f, "Validation failed: {}", msg),
            ConfigurationError::MissingRequired(field) => write!(f, "Missing required field: {}", field),
            ConfigurationError::InvalidValue { field, value, reason } => {
                write!(f, "Invalid value for {}: '{}' ({})", field, value, reason)
            }
            ConfigurationError::LoadFailed(msg) => write!(f, "Failed to load configuration: {}", msg),
            ConfigurationError::SaveFailed(msg) => write!(f, "Failed to save configuration: {}", msg),
            ConfigurationError::UnknownTheme(id) => write!(f, "Unknown theme: {}", id),
            ConfigurationError::SymbolSetTooSmall { theme, retries } => write!(
                f,
                "Theme '{}' cannot produce a losing line after {} retries (symbol set too small)",
                theme, retries
            ),
        }
    }
}

impl fmt::Display for WagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WagerError::InvalidBet { bet, reason } => write!(f, "Invalid bet {}: {}", bet, reason),
            WagerError::AlreadyInFlight => write!(f, "A spin is already in flight"),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InsufficientFunds { requested, available } => {
                write!(f, "Insufficient funds: requested {}, available {}", requested, available)
            }
            LedgerError::Overflow { balance, amount } => {
                write!(f, "Balance overflow: {} + {}", balance, amount)
            }
            LedgerError::PayoutOverflow { bet, multiplier } => {
                write!(f, "Payout overflow: {} x{}", bet, multiplier)
            }
        }
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::TaskFailed { task, reason } => write!(f, "Task '{}' failed: {}", task, reason),
        }
    }
}

impl std::error::Error for SpinDripError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpinDripError::Configuration(e) => Some(e),
            SpinDripError::Wager(e) => Some(e),
            SpinDripError::Ledger(e) => Some(e),
            SpinDripError::Scheduler(e) => Some(e),
        }
    }
}

impl std::error::Error for ConfigurationError {}
impl std::error::Error for WagerError {}
impl std::error::Error for LedgerError {}
impl std::error::Error for SchedulerError {}

impl From<ConfigurationError> for SpinDripError {
    fn from(e: ConfigurationError) -> Self {
        SpinDripError::Configuration(e)
    }
}

impl From<WagerError> for SpinDripError {
    fn from(e: WagerError) -> Self {
        SpinDripError::Wager(e)
    }
}

impl From<LedgerError> for SpinDripError {
    fn from(e: LedgerError) -> Self {
        SpinDripError::Ledger(e)
    }
}

impl From<SchedulerError> for SpinDripError {
    fn from(e: SchedulerError) -> Self {
        SpinDripError::Scheduler(e)
    }
}

// External error conversions
impl From<std::io::Error> for SpinDripError {
    fn from(e: std::io::Error) -> Self {
        SpinDripError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for SpinDripError {
    fn from(e: toml::de::Error) -> Self {
        SpinDripError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for SpinDripError {
    fn from(e: serde_json::Error) -> Self {
        SpinDripError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

pub type SpinDripResult<T> = Result<T, SpinDripError>;
