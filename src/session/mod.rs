//! The page-session abstraction the harvest pipeline drives.
//!
//! A session owns one rendered page. The pipeline only ever needs to
//! navigate, read the current DOM, scroll, and pick an option from a slate
//! control, so that is the whole surface. [`ChromeSession`] drives a real
//! browser; [`SimulatedSession`] renders an in-memory page for tests and
//! snapshot replay.

mod chrome;
mod simulated;

pub use chrome::ChromeSession;
pub use simulated::{SessionStats, SimulatedSession, SimulatedSlate};

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, Result};

/// Locates the slate control on the page: the `index`-th match of `selector`
/// in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlateControl {
    pub selector: String,
    pub index: usize,
}

impl SlateControl {
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

impl std::fmt::Display for SlateControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)
    }
}

/// Methods take `&self` so retry closures can capture a shared borrow.
/// Implementations serialize access internally; callers hold the session
/// exclusively for the duration of a run.
#[async_trait]
pub trait PageSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Serialized HTML of the current DOM.
    async fn content(&self) -> Result<String>;

    /// Rows currently rendered in the first table matching `table_selector`,
    /// or `None` when no such table is attached yet.
    async fn row_count(&self, table_selector: &str, row_selector: &str) -> Result<Option<usize>> {
        let html = self.content().await?;
        count_rows(&html, table_selector, row_selector)
    }

    async fn scroll_to_bottom(&self) -> Result<()>;

    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    async fn scroll_to_top(&self) -> Result<()>;

    /// Click the first visible, enabled element matching `selector`.
    /// Returns `false` when there is nothing to click.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Choose the option whose visible label, whitespace collapsed, equals
    /// `label` and fire the control's change event.
    async fn select_option(&self, control: &SlateControl, label: &str) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

/// Count rows of the first matching table in a serialized document.
pub fn count_rows(html: &str, table_selector: &str, row_selector: &str) -> Result<Option<usize>> {
    let table_selector = parse_selector(table_selector)?;
    let row_selector = parse_selector(row_selector)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&table_selector)
        .next()
        .map(|table| table.select(&row_selector).count()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rows() {
        let html = r#"
            <html><body>
                <table id="results">
                    <tr><th>POS</th><th>PLAYER</th></tr>
                    <tr><td>QB</td><td>Jane Doe</td></tr>
                    <tr><td>WR</td><td>Sam Hill</td></tr>
                </table>
                <table><tr><td>ignored</td></tr></table>
            </body></html>
        "#;

        assert_eq!(count_rows(html, "table", "tr").unwrap(), Some(3));
        assert_eq!(count_rows(html, "table.missing", "tr").unwrap(), None);
    }

    #[test]
    fn test_invalid_selector_is_validation_error() {
        let result = count_rows("<html></html>", "div >", "tr");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
