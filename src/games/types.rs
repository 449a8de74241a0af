use crate::errors::{ConfigurationError, SpinDripError, SpinDripResult};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Minimum number of symbols a theme must carry
pub const MIN_THEME_SYMBOLS: usize = 5;

/// Number of reels on the machine
pub const REEL_COUNT: usize = 3;

/// Outcome classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Jackpot,
    Minor,
    Loss,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Jackpot => write!(f, "jackpot"),
            Tier::Minor => write!(f, "minor"),
            Tier::Loss => write!(f, "loss"),
        }
    }
}

/// A game skin: an ordered symbol set.
///
/// `symbols[0]` anchors the jackpot line and `symbols[1]` the minor line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ThemeRecord")]
pub struct Theme {
    id: String,
    name: String,
    symbols: Vec<String>,
}

/// Unchecked wire form of a [`Theme`]
#[derive(Deserialize)]
struct ThemeRecord {
    id: String,
    name: String,
    symbols: Vec<String>,
}

impl TryFrom<ThemeRecord> for Theme {
    type Error = SpinDripError;

    fn try_from(record: ThemeRecord) -> Result<Self, Self::Error> {
        Theme::new(record.id, record.name, record.symbols)
    }
}

impl Theme {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        symbols: Vec<String>,
    ) -> SpinDripResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigurationError::MissingRequired("theme.id".to_string()).into());
        }
        if symbols.len() < MIN_THEME_SYMBOLS {
            return Err(ConfigurationError::InvalidValue {
                field: format!("theme.{}.symbols", id),
                value: symbols.len().to_string(),
                reason: format!("A theme needs at least {} symbols", MIN_THEME_SYMBOLS),
            }
            .into());
        }
        if symbols.iter().any(|s| s.is_empty()) {
            return Err(ConfigurationError::InvalidValue {
                field: format!("theme.{}.symbols", id),
                value: "\"\"".to_string(),
                reason: "Symbols cannot be empty".to_string(),
            }
            .into());
        }

        Ok(Self {
            id,
            name: name.into(),
            symbols,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn symbol(&self, index: usize) -> &str {
        &self.symbols[index]
    }

    pub fn jackpot_symbol(&self) -> &str {
        &self.symbols[0]
    }

    pub fn minor_symbol(&self) -> &str {
        &self.symbols[1]
    }

    pub fn distinct_symbols(&self) -> usize {
        self.symbols.iter().collect::<HashSet<_>>().len()
    }
}

/// Settled outcome of one spin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpinResult {
    pub theme_id: String,
    pub bet: Money,
    pub symbols: [String; REEL_COUNT],
    pub tier: Tier,
    /// Payout multiplier applied to the bet (0 on a loss)
    pub multiplier: u64,
    pub win_amount: Money,
}

impl SpinResult {
    pub fn is_win(&self) -> bool {
        !self.win_amount.is_zero()
    }

    pub fn all_symbols_equal(&self) -> bool {
        self.symbols[0] == self.symbols[1] && self.symbols[1] == self.symbols[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_theme_anchors() {
        let theme = Theme::new("t", "Test", symbols(&["A", "B", "C", "D", "E"])).unwrap();
        assert_eq!(theme.jackpot_symbol(), "A");
        assert_eq!(theme.minor_symbol(), "B");
        assert_eq!(theme.distinct_symbols(), 5);
    }

    #[test]
    fn test_theme_requires_five_symbols() {
        assert!(Theme::new("t", "Test", symbols(&["A", "B", "C", "D"])).is_err());
        assert!(Theme::new("", "Test", symbols(&["A", "B", "C", "D", "E"])).is_err());
        assert!(Theme::new("t", "Test", symbols(&["A", "", "C", "D", "E"])).is_err());
    }

    #[test]
    fn test_theme_deserialization_is_validated() {
        let theme: Theme =
            serde_json::from_str(r#"{"id":"t","name":"Test","symbols":["A","B","C","D","E"]}"#).unwrap();
        assert_eq!(theme.minor_symbol(), "B");

        let short = serde_json::from_str::<Theme>(r#"{"id":"t","name":"Test","symbols":["A"]}"#);
        let err = short.unwrap_err().to_string();
        assert!(err.contains("at least 5 symbols"), "{}", err);
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Jackpot).unwrap(), "\"jackpot\"");
        assert_eq!(Tier::Minor.to_string(), "minor");
    }
}
