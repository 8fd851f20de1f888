use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

pub(crate) static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

static LINK_REL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel]").unwrap());

/// Hyperlinks of an HTML fragment or document.
///
/// Parsing happens once in [`LinkExtractor::parse`]; every call to
/// [`LinkExtractor::hrefs`] walks the tree again from the start.
pub struct LinkExtractor {
    document: Html,
}

impl LinkExtractor {
    /// Parse leniently. html5ever recovers from any input, so this cannot fail.
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// `<a href>` values in document order, verbatim apart from trimming.
    pub fn hrefs(&self) -> impl Iterator<Item = &str> + '_ {
        self.anchors()
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
    }

    fn anchors(&self) -> impl Iterator<Item = ElementRef<'_>> + '_ {
        self.document.select(&ANCHOR_SELECTOR)
    }
}

/// `href` of the first `<link>` whose `rel` contains the `pingback` token.
///
/// Returns `None` when no such element exists or when it has no `href`.
pub fn pingback_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link = document.select(&LINK_REL_SELECTOR).find(|link| {
        link.value().attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("pingback"))
        })
    })?;
    link.value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_owned)
}

/// Scheme, host and effective port all match.
pub fn same_site(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Whether `candidate` points outside the site rooted at `site_base`.
///
/// The candidate is resolved against the base first, so site-relative paths
/// are internal and protocol-relative ones (`//host/`) keep their own host.
/// Anything without a host (`mailto:`, unparsable input) is internal.
pub fn is_external(candidate: &str, site_base: &Url) -> bool {
    let Ok(resolved) = site_base.join(candidate.trim()) else {
        return false;
    };
    if resolved.host_str().is_none() {
        return false;
    }
    !same_site(&resolved, site_base)
}
