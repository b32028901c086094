use async_trait::async_trait;
use scraper::Html;
use std::sync::{Mutex, MutexGuard};

use super::{PageSession, SlateControl, parse_selector};
use crate::utils::error::{AppError, Result};
use crate::utils::text::{collapse_whitespace, escape_html};

const DEFAULT_HEADER: &[&str] = &["POS", "PLAYER", "SALARY", "FPPG", "POINTS"];

/// Marks rendered elements whose click reveals more rows.
const REVEAL_ATTR: &str = "data-reveal";

/// Clickable control that attaches more rows to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickControl {
    LoadMore,
    NextPage,
}

/// One slate's worth of table content for a [`SimulatedSession`].
#[derive(Debug, Clone)]
pub struct SimulatedSlate {
    label: String,
    value: Option<String>,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    initial_visible: Option<usize>,
    reveal_per_scroll: usize,
    bottom_reveal_limit: Option<usize>,
    reveal_on_incremental: bool,
    click_control: Option<ClickControl>,
    reveal_per_click: usize,
    has_table: bool,
    selectable: bool,
}

impl SimulatedSlate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            header: DEFAULT_HEADER.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            initial_visible: None,
            reveal_per_scroll: 0,
            bottom_reveal_limit: None,
            reveal_on_incremental: false,
            click_control: None,
            reveal_per_click: 0,
            has_table: true,
            selectable: true,
        }
    }

    /// `value` attribute of the slate's `<option>`.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_header(mut self, header: &[&str]) -> Self {
        self.header = header.iter().map(|h| h.to_string()).collect();
        self
    }

    /// Append a data row. Cells containing `\n` render as stacked block lines.
    pub fn row(mut self, cells: &[&str]) -> Self {
        self.rows.push(cells.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Render only `initial_visible` rows until scrolled; every bottom scroll
    /// attaches `reveal_per_scroll` more.
    pub fn lazy(mut self, initial_visible: usize, reveal_per_scroll: usize) -> Self {
        self.initial_visible = Some(initial_visible);
        self.reveal_per_scroll = reveal_per_scroll;
        self
    }

    /// Bottom scrolls stop revealing rows after `limit` reveals.
    pub fn stall_bottom_after(mut self, limit: usize) -> Self {
        self.bottom_reveal_limit = Some(limit);
        self
    }

    /// Incremental scrolls reveal rows too.
    pub fn reveal_on_incremental(mut self) -> Self {
        self.reveal_on_incremental = true;
        self
    }

    /// Render `initial_visible` rows under a "Load more" button; each click
    /// attaches `per_click` more. Scrolling reveals nothing.
    pub fn load_more(mut self, initial_visible: usize, per_click: usize) -> Self {
        self.initial_visible = Some(initial_visible);
        self.click_control = Some(ClickControl::LoadMore);
        self.reveal_per_click = per_click;
        self
    }

    /// Like [`SimulatedSlate::load_more`], behind a paginator's "next" link
    /// that appends each page to the table.
    pub fn paginated(mut self, initial_visible: usize, per_page: usize) -> Self {
        self.initial_visible = Some(initial_visible);
        self.click_control = Some(ClickControl::NextPage);
        self.reveal_per_click = per_page;
        self
    }

    pub fn without_table(mut self) -> Self {
        self.has_table = false;
        self
    }

    /// Selecting this slate fails as if its option were stale.
    pub fn failing_selection(mut self) -> Self {
        self.selectable = false;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn visible_rows(&self, scroll_reveals: usize, click_reveals: usize) -> usize {
        match self.initial_visible {
            Some(initial) => (initial
                + scroll_reveals * self.reveal_per_scroll
                + click_reveals * self.reveal_per_click)
                .min(self.rows.len()),
            None => self.rows.len(),
        }
    }
}

/// Scroll and selection counters, for asserting on how a session was driven.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub navigations: usize,
    pub bottom_scrolls: usize,
    pub incremental_scrolls: usize,
    pub top_scrolls: usize,
    pub clicks: usize,
    pub selections: usize,
    pub closed: bool,
}

#[derive(Debug)]
enum Page {
    Slates {
        slates: Vec<SimulatedSlate>,
        control: bool,
        placeholder: Option<String>,
        current: usize,
        bottom_reveals: usize,
        incremental_reveals: usize,
        click_reveals: usize,
    },
    Static(String),
}

#[derive(Debug)]
struct SimState {
    page: Page,
    stats: SessionStats,
}

/// An in-memory page that behaves like the results view: an optional slate
/// `<select>`, a lazily growing table, and deterministic scroll effects.
#[derive(Debug)]
pub struct SimulatedSession {
    state: Mutex<SimState>,
}

impl SimulatedSession {
    fn from_page(page: Page) -> Self {
        Self {
            state: Mutex::new(SimState {
                page,
                stats: SessionStats::default(),
            }),
        }
    }

    /// A page with one table and no slate control.
    pub fn single(slate: SimulatedSlate) -> Self {
        Self::from_page(Page::Slates {
            slates: vec![slate],
            control: false,
            placeholder: None,
            current: 0,
            bottom_reveals: 0,
            incremental_reveals: 0,
            click_reveals: 0,
        })
    }

    /// A page with a slate `<select>` offering `slates` in order. The first
    /// slate is shown until another is selected.
    pub fn with_control(slates: Vec<SimulatedSlate>) -> Self {
        Self::from_page(Page::Slates {
            slates,
            control: true,
            placeholder: None,
            current: 0,
            bottom_reveals: 0,
            incremental_reveals: 0,
            click_reveals: 0,
        })
    }

    /// Adds a leading placeholder option with an empty value.
    pub fn with_placeholder(self, label: impl Into<String>) -> Self {
        {
            let mut state = self.lock();
            if let Page::Slates { placeholder, .. } = &mut state.page {
                *placeholder = Some(label.into());
            }
        }
        self
    }

    /// Replays a saved page. Scrolling has no effect and selection fails.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self::from_page(Page::Static(html.into()))
    }

    pub fn stats(&self) -> SessionStats {
        self.lock().stats.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // State is plain data; a panic mid-update cannot leave it unusable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn render_cell(tag: &str, text: &str) -> String {
    if text.contains('\n') {
        let lines: String = text
            .lines()
            .map(|line| format!("<div>{}</div>", escape_html(line)))
            .collect();
        format!("<{tag}>{lines}</{tag}>")
    } else {
        format!("<{tag}>{}</{tag}>", escape_html(text))
    }
}

fn render(page: &Page) -> String {
    let (slates, control, placeholder, current, reveals, clicks) = match page {
        Page::Static(html) => return html.clone(),
        Page::Slates {
            slates,
            control,
            placeholder,
            current,
            bottom_reveals,
            incremental_reveals,
            click_reveals,
        } => (
            slates,
            *control,
            placeholder,
            *current,
            bottom_reveals + incremental_reveals,
            *click_reveals,
        ),
    };

    let mut html = String::from("<html><head><title>Completed Contests</title></head><body>\n");

    if control {
        html.push_str("<select name=\"gameTime\">");
        if let Some(label) = placeholder {
            html.push_str(&format!("<option value=\"\">{}</option>", escape_html(label)));
        }
        for (i, slate) in slates.iter().enumerate() {
            let value = slate.value.as_deref().unwrap_or(&slate.label);
            let selected = if i == current { " selected" } else { "" };
            html.push_str(&format!(
                "<option value=\"{}\"{}>{}</option>",
                escape_html(value),
                selected,
                escape_html(&slate.label)
            ));
        }
        html.push_str("</select>\n");
    }

    if let Some(slate) = slates.get(current) {
        if slate.has_table {
            html.push_str("<table class=\"results\"><thead><tr>");
            for cell in &slate.header {
                html.push_str(&render_cell("th", cell));
            }
            html.push_str("</tr></thead><tbody>\n");
            let visible = slate.visible_rows(reveals, clicks);
            for row in slate.rows.iter().take(visible) {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&render_cell("td", cell));
                }
                html.push_str("</tr>\n");
            }
            html.push_str("</tbody></table>\n");

            // Controls disappear once every row is attached
            if visible < slate.rows.len() {
                match slate.click_control {
                    Some(ClickControl::LoadMore) => html.push_str(&format!(
                        "<button class=\"load-more\" {}>Load more</button>\n",
                        REVEAL_ATTR
                    )),
                    Some(ClickControl::NextPage) => html.push_str(&format!(
                        "<nav class=\"pagination\"><a class=\"next\" href=\"#\" {}>Next</a></nav>\n",
                        REVEAL_ATTR
                    )),
                    None => {}
                }
            }
        }
    }

    html.push_str("</body></html>");
    html
}

#[async_trait]
impl PageSession for SimulatedSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        url::Url::parse(url).map_err(|e| AppError::Browser(format!("Navigation failed: {}", e)))?;
        self.lock().stats.navigations += 1;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(render(&self.lock().page))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        let mut state = self.lock();
        state.stats.bottom_scrolls += 1;
        if let Page::Slates {
            slates,
            current,
            bottom_reveals,
            ..
        } = &mut state.page
        {
            let limit = slates
                .get(*current)
                .and_then(|s| s.bottom_reveal_limit)
                .unwrap_or(usize::MAX);
            if *bottom_reveals < limit {
                *bottom_reveals += 1;
            }
        }
        Ok(())
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<()> {
        let mut state = self.lock();
        state.stats.incremental_scrolls += 1;
        if let Page::Slates {
            slates,
            current,
            incremental_reveals,
            ..
        } = &mut state.page
        {
            if slates.get(*current).is_some_and(|s| s.reveal_on_incremental) {
                *incremental_reveals += 1;
            }
        }
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.lock().stats.top_scrolls += 1;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let selector = parse_selector(selector)?;
        let mut state = self.lock();

        let document = Html::parse_document(&render(&state.page));
        let clickable = document
            .select(&selector)
            .any(|el| el.value().attr(REVEAL_ATTR).is_some() && el.value().attr("disabled").is_none());
        if !clickable {
            return Ok(false);
        }

        state.stats.clicks += 1;
        if let Page::Slates { click_reveals, .. } = &mut state.page {
            *click_reveals += 1;
        }
        Ok(true)
    }

    async fn select_option(&self, control: &SlateControl, label: &str) -> Result<()> {
        let mut state = self.lock();
        state.stats.selections += 1;

        let Page::Slates {
            slates,
            control: has_control,
            current,
            bottom_reveals,
            incremental_reveals,
            click_reveals,
            ..
        } = &mut state.page
        else {
            return Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: "page is a static snapshot".to_string(),
            });
        };

        if !*has_control || control.index != 0 {
            return Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: format!("control {} is not attached", control),
            });
        }

        let wanted = collapse_whitespace(label);
        let Some(position) = slates.iter().position(|s| collapse_whitespace(&s.label) == wanted) else {
            return Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: "option not found".to_string(),
            });
        };
        if !slates[position].selectable {
            return Err(AppError::SlateSelection {
                slate: label.to_string(),
                message: "option is stale".to_string(),
            });
        }

        *current = position;
        *bottom_reveals = 0;
        *incremental_reveals = 0;
        *click_reveals = 0;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.lock().stats.closed = true;
        Ok(())
    }
}
