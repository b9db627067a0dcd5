use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Parsed copy of the page at one scroll position.
///
/// Holds the raw source for regex fallbacks and a rendered-text
/// approximation (visible text nodes, one per line).
pub struct PageSnapshot {
    document: Html,
    source: String,
    text: String,
}

impl PageSnapshot {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let document = Html::parse_document(&source);
        let text = rendered_text(document.root_element());
        Self {
            document,
            source,
            text,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn selector(css: &str) -> Option<Selector> {
        match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(err) => {
                debug!(css, error = ?err, "Unusable selector");
                None
            }
        }
    }

    /// Rendered text of every element matching `css`
    pub fn select_texts(&self, css: &str) -> Vec<String> {
        let Some(selector) = Self::selector(css) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(rendered_text)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// Values of `attr` on every element matching `css`
    pub fn select_attrs(&self, css: &str, attr: &str) -> Vec<String> {
        let Some(selector) = Self::selector(css) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::to_string)
            .collect()
    }

    /// Elements whose own text (not their descendants') contains `needle`,
    /// compared case-insensitively
    pub fn elements_containing(&self, needle: &str) -> Vec<ElementRef<'_>> {
        let needle = needle.to_lowercase();
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| !is_hidden(element.value().name()))
            .filter(|element| {
                element
                    .children()
                    .filter_map(|child| child.value().as_text())
                    .any(|text| text.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// Walks up to `levels` parents, stopping at the document root
pub fn ancestor(element: ElementRef<'_>, levels: usize) -> ElementRef<'_> {
    let mut current = element;
    for _ in 0..levels {
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Descendants of `element` matching `css`
pub fn select_within<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Slice of at most `len` bytes starting at `start`, trimmed back to a char
/// boundary
pub fn window(text: &str, start: usize, len: usize) -> &str {
    let start = start.min(text.len());
    let mut end = start.saturating_add(len).min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.get(start..end).unwrap_or("")
}

fn is_hidden(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template")
}

/// Visible text under `element`, trimmed text nodes joined by newlines
pub fn rendered_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| is_hidden(el.name())))
                .unwrap_or(false);
            let trimmed = text.trim();
            (!hidden && !trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
