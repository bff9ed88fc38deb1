//! Option catalogs — the enumerated choice sets behind selection menus.
//!
//! A catalog maps stable option ids to display labels and (optionally) to
//! the group/role granted when the option is chosen. Catalogs are read-only
//! configuration, shared by all sessions without mutation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One selectable option: stable id, human-facing label, optional target role.
///
/// An entry with no role is a placeholder ("Other", "Prefer not to say");
/// selecting it changes no memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl CatalogEntry {
    pub fn new(
        value: impl Into<String>,
        label: impl Into<String>,
        role: Option<&str>,
    ) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            role: role.map(|r| r.to_string()),
        }
    }
}

/// An ordered option set for one category, with selection bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionCatalog {
    /// Category key ("location", "occupation", "major", "level").
    pub category: String,
    /// Prompt title shown above the menu.
    pub title: String,
    pub entries: Vec<CatalogEntry>,
    /// Minimum number of selections the menu accepts.
    #[serde(default)]
    pub min_choices: usize,
    /// Maximum number of selections; `None` means "all entries".
    #[serde(default)]
    pub max_choices: Option<usize>,
}

impl OptionCatalog {
    /// The effective upper selection bound: the configured maximum, capped
    /// at the entry count, or the entry count when unset.
    pub fn effective_max(&self) -> usize {
        let all = self.entries.len();
        self.max_choices.map_or(all, |max| max.min(all))
    }

    /// Map selected option ids to target role names, in selection order.
    ///
    /// Ids that match no entry, and entries that carry no role, are dropped
    /// silently: an unmapped selection is a no-op, not an error.
    pub fn roles_for(&self, selected: &[String]) -> Vec<String> {
        selected
            .iter()
            .filter_map(|value| {
                self.entries
                    .iter()
                    .find(|entry| entry.value == *value)
                    .and_then(|entry| entry.role.clone())
            })
            .collect()
    }

    /// Validate structural invariants at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Err(ConfigError::EmptyCatalog {
                category: self.category.clone(),
            });
        }
        if self.min_choices > self.effective_max() {
            return Err(ConfigError::InvalidValue {
                key: format!("catalog.{}.min_choices", self.category),
                message: format!(
                    "minimum {} exceeds effective maximum {}",
                    self.min_choices,
                    self.effective_max()
                ),
            });
        }
        Ok(())
    }
}
