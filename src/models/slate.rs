use serde::{Deserialize, Serialize};

/// Identifier used when a page exposes no slate control at all.
pub const DEFAULT_SLATE_ID: &str = "default";

/// One selectable partition of the table, as offered by the page's slate control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Slate {
    pub id: String,
    pub display_label: String,
}

impl Slate {
    pub fn new(id: impl Into<String>, display_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_label: display_label.into(),
        }
    }

    /// The implicit slate standing in for the current view of a single-slate page.
    pub fn implicit() -> Self {
        Self::new(DEFAULT_SLATE_ID, DEFAULT_SLATE_ID)
    }

    /// Case-insensitive match on either the id or the visible label.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.id.eq_ignore_ascii_case(query) || self.display_label.eq_ignore_ascii_case(query)
    }
}

impl std::fmt::Display for Slate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.id == self.display_label {
            write!(f, "{}", self.display_label)
        } else {
            write!(f, "{} ({})", self.display_label, self.id)
        }
    }
}
