//! Built-in theme catalog
//!
//! The core only needs a `theme id -> Theme` lookup; this catalog provides
//! the five machines shipped with the lobby, keyed by their ids.

use crate::errors::{ConfigurationError, SpinDripResult};
use crate::games::types::Theme;
use std::collections::BTreeMap;

/// Theme used when a lobby id is not recognised
pub const DEFAULT_THEME_ID: &str = "golden-rooster";

const BUILT_IN_THEMES: &[(&str, &str, [&str; 5])] = &[
    ("golden-rooster", "Golden Rooster", ["🐓", "🥚", "🌟", "💰", "🔔"]),
    ("mbk-gangster", "MBK Gangster", ["🔫", "💰", "🚗", "💎", "👑"]),
    ("crown-rich", "Crown Rich", ["👑", "💎", "💰", "🏆", "⭐"]),
    ("dollar-eagle", "Dollar Eagle", ["🦅", "💵", "🏔️", "⚡", "🌟"]),
    ("lion-gold", "Lion Gold", ["🦁", "👑", "💰", "🌟", "🔥"]),
];

/// Lookup table of playable themes
#[derive(Debug, Clone)]
pub struct ThemeCatalog {
    themes: BTreeMap<String, Theme>,
    default_id: String,
}

impl ThemeCatalog {
    /// Catalog with the built-in machines
    pub fn built_in() -> Self {
        let themes = BUILT_IN_THEMES
            .iter()
            .filter_map(|(id, name, symbols)| {
                Theme::new(*id, *name, symbols.iter().map(|s| s.to_string()).collect()).ok()
            })
            .map(|theme| (theme.id().to_string(), theme))
            .collect();

        Self {
            themes,
            default_id: DEFAULT_THEME_ID.to_string(),
        }
    }

    /// Empty catalog falling back to `default_id`
    pub fn new(default_id: impl Into<String>) -> Self {
        Self {
            themes: BTreeMap::new(),
            default_id: default_id.into(),
        }
    }

    pub fn insert(&mut self, theme: Theme) {
        self.themes.insert(theme.id().to_string(), theme);
    }

    /// Strict lookup
    pub fn lookup(&self, id: &str) -> SpinDripResult<&Theme> {
        self.themes
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownTheme(id.to_string()).into())
    }

    /// Lookup with fallback to the default theme
    pub fn resolve(&self, id: &str) -> SpinDripResult<&Theme> {
        self.lookup(id).or_else(|_| self.lookup(&self.default_id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.themes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}
