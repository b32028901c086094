use scraper::{ElementRef, Html};

use crate::config::SlateConfig;
use crate::models::Slate;
use crate::session::{parse_selector, PageSession};
use crate::utils::error::Result;
use crate::utils::text::collapse_whitespace;

pub use crate::session::SlateControl;

/// What the page offers for slate selection.
///
/// With no control the page is a single-slate view and `slates` is empty;
/// callers harvest it as [`Slate::implicit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlateDiscovery {
    pub control: Option<SlateControl>,
    pub slates: Vec<Slate>,
}

impl SlateDiscovery {
    pub fn implicit() -> Self {
        Self::default()
    }

    pub fn is_implicit(&self) -> bool {
        self.control.is_none()
    }

    /// Slates to iterate, in discovery order.
    pub fn slates_to_harvest(&self) -> Vec<Slate> {
        if self.is_implicit() {
            vec![Slate::implicit()]
        } else {
            self.slates.clone()
        }
    }

    /// Keep only slates whose label or id matches `query`. Returns the label
    /// of the kept slate, if any.
    pub fn restrict(&mut self, query: &str) -> Option<String> {
        if self.is_implicit() {
            tracing::warn!(slate = query, "Page has no slate control; ignoring slate restriction");
            return None;
        }

        self.slates.retain(|slate| slate.matches(query));
        match self.slates.first() {
            Some(slate) => Some(slate.display_label.clone()),
            None => {
                tracing::warn!(slate = query, "No discovered slate matches restriction");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlateDiscoverer {
    control_selector: Option<String>,
    candidates: Vec<String>,
    placeholders: Vec<String>,
}

impl SlateDiscoverer {
    pub fn new(
        control_selector: Option<String>,
        candidates: Vec<String>,
        placeholders: Vec<String>,
    ) -> Self {
        Self {
            control_selector,
            candidates,
            placeholders,
        }
    }

    pub fn from_config(config: &SlateConfig) -> Self {
        Self::new(
            config.control_selector.clone(),
            config.candidate_selectors.clone(),
            config.placeholder_labels.clone(),
        )
    }

    pub async fn discover<S: PageSession + ?Sized>(&self, session: &S) -> Result<SlateDiscovery> {
        let html = session.content().await?;
        let discovery = self.discover_in(&html)?;

        match &discovery.control {
            Some(control) => tracing::info!(
                control = %control,
                slates = discovery.slates.len(),
                labels = ?discovery.slates.iter().map(|s| s.display_label.as_str()).collect::<Vec<_>>(),
                "Discovered slates"
            ),
            None => tracing::info!("No slate control found; harvesting current view"),
        }

        Ok(discovery)
    }

    /// Scan a serialized page. A pinned control wins outright; otherwise
    /// candidates are tried in order, elements in document order, and the
    /// first control offering more than one usable option is taken.
    pub fn discover_in(&self, html: &str) -> Result<SlateDiscovery> {
        let document = Html::parse_document(html);

        if let Some(pinned) = &self.control_selector {
            let selector = parse_selector(pinned)?;
            return Ok(match document.select(&selector).next() {
                Some(element) => SlateDiscovery {
                    control: Some(SlateControl::new(pinned.clone(), 0)),
                    slates: self.usable_options(element),
                },
                None => {
                    tracing::warn!(selector = %pinned, "Configured slate control not found");
                    SlateDiscovery::implicit()
                }
            });
        }

        for candidate in &self.candidates {
            let selector = parse_selector(candidate)?;
            for (index, element) in document.select(&selector).enumerate() {
                let slates = self.usable_options(element);
                if slates.len() > 1 {
                    return Ok(SlateDiscovery {
                        control: Some(SlateControl::new(candidate.clone(), index)),
                        slates,
                    });
                }
            }
        }

        Ok(SlateDiscovery::implicit())
    }

    fn is_placeholder(&self, label: &str) -> bool {
        self.placeholders.iter().any(|p| p.trim().eq_ignore_ascii_case(label))
    }

    fn usable_options(&self, control: ElementRef<'_>) -> Vec<Slate> {
        let Ok(option_selector) = parse_selector("option") else {
            return Vec::new();
        };

        let mut slates: Vec<Slate> = Vec::new();
        for option in control.select(&option_selector) {
            let label = collapse_whitespace(&option.text().collect::<String>());
            if label.is_empty() || self.is_placeholder(&label) {
                continue;
            }
            if slates.iter().any(|s| s.display_label == label) {
                continue;
            }

            let id = option
                .value()
                .attr("value")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| label.clone());
            slates.push(Slate::new(id, label));
        }
        slates
    }
}
