use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::extractor::links::ANCHOR_SELECTOR;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// A fetched page, parsed once and kept together with the URL it came from
/// so relative hrefs can be resolved.
pub struct SourceDocument {
    html: Html,
    url: Url,
}

impl SourceDocument {
    pub fn parse(html: &str, url: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            url,
        }
    }

    /// Text of the first non-empty `<title>`, whitespace collapsed.
    pub fn title(&self) -> Option<String> {
        self.html
            .select(&TITLE_SELECTOR)
            .map(|title| {
                title
                    .text()
                    .flat_map(str::split_whitespace)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .find(|title| !title.is_empty())
    }

    /// First anchor in document order whose href, resolved against the
    /// document URL, is exactly `target`.
    pub fn find_anchor(&self, target: &Url) -> Option<ElementRef<'_>> {
        self.html.select(&ANCHOR_SELECTOR).find(|anchor| {
            anchor
                .value()
                .attr("href")
                .and_then(|href| self.url.join(href.trim()).ok())
                .is_some_and(|resolved| &resolved == target)
        })
    }

    pub fn links_to(&self, target: &Url) -> bool {
        self.find_anchor(target).is_some()
    }
}
