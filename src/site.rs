//! The current site: where it lives, how its content is addressed, and which
//! of its URLs name a single content item.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::entities::ContentItem;
use crate::extractor::{is_external, same_site};

static DETAIL_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d{4})/(\d{2})/(\d{2})/([-\w]+)/$").unwrap());

/// Archive, taxonomy and feed pages: resolvable, but never pingback targets.
static LISTING_ROUTES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/(?:\d{4}/(?:\d{2}/(?:\d{2}/)?)?|page/\d+/|tags/(?:[^/]+/)?|metatypes/(?:[-\w]+/)*|authors/(?:[^/]+/)?|search/|feeds/(?:[-\w]+/)*)?$",
    )
    .unwrap()
});

/// Date-and-slug key addressing one content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permalink {
    pub date: NaiveDate,
    pub slug: String,
}

/// What a URL means on this site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Another scheme, host or port.
    Foreign,
    /// Same site, but no route matches the path.
    NotFound,
    /// A page listing many items (home, archives, tags, feeds...).
    Listing,
    Detail(Permalink),
}

#[derive(Debug, Clone)]
pub struct Site {
    base_url: Url,
    name: String,
    feed_path: String,
}

impl Site {
    /// `base_url` is normalised to end with `/` so joins stay under it.
    pub fn new(mut base_url: Url, name: impl Into<String>, feed_path: impl Into<String>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        base_url.set_query(None);
        base_url.set_fragment(None);
        let feed_path: String = feed_path.into();
        Self {
            base_url,
            name: name.into(),
            feed_path: feed_path.trim_start_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Front page of the blog, as announced to ping directories.
    pub fn blog_url(&self) -> Url {
        self.base_url.clone()
    }

    pub fn feed_url(&self) -> Url {
        self.join(&self.feed_path)
    }

    pub fn trackback_url(&self, content_id: i64) -> Url {
        self.join(&format!("trackback/{content_id}/"))
    }

    /// Canonical `<base>/YYYY/MM/DD/slug/` address of an item.
    pub fn permalink(&self, item: &ContentItem) -> Url {
        let date = item.creation_date.date_naive();
        self.join(&format!(
            "{:04}/{:02}/{:02}/{}/",
            date.year(),
            date.month(),
            date.day(),
            item.slug
        ))
    }

    pub fn is_external(&self, candidate: &str) -> bool {
        is_external(candidate, &self.base_url)
    }

    pub fn resolve(&self, url: &Url) -> Route {
        if !same_site(url, &self.base_url) {
            return Route::Foreign;
        }
        let prefix = self.base_url.path().trim_end_matches('/');
        let Some(path) = url.path().strip_prefix(prefix) else {
            return Route::NotFound;
        };
        if !path.starts_with('/') {
            return Route::NotFound;
        }

        if let Some(caps) = DETAIL_ROUTE.captures(path) {
            let date = caps[1]
                .parse::<i32>()
                .ok()
                .zip(caps[2].parse::<u32>().ok())
                .zip(caps[3].parse::<u32>().ok())
                .and_then(|((year, month), day)| NaiveDate::from_ymd_opt(year, month, day));
            return match date {
                Some(date) => Route::Detail(Permalink {
                    date,
                    slug: caps[4].to_string(),
                }),
                None => Route::NotFound,
            };
        }

        if LISTING_ROUTES.is_match(path) {
            Route::Listing
        } else {
            Route::NotFound
        }
    }

    fn join(&self, relative: &str) -> Url {
        // relative paths built from slugs and numbers always join cleanly
        self.base_url
            .join(relative)
            .unwrap_or_else(|_| self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ContentStatus;
    use chrono::{TimeZone, Utc};

    fn site() -> Site {
        Site::new(Url::parse("http://localhost:8000").unwrap(), "Gstudio", "feeds/")
    }

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    fn item() -> ContentItem {
        ContentItem {
            id: 7,
            title: "My first nodetype".into(),
            slug: "my-first-nodetype".into(),
            body_html: String::new(),
            status: ContentStatus::Published,
            pingback_enabled: true,
            categories: vec![],
            creation_date: Utc.with_ymd_and_hms(2010, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn builds_site_urls() {
        let site = site();
        assert_eq!(
            site.permalink(&item()).as_str(),
            "http://localhost:8000/2010/01/01/my-first-nodetype/"
        );
        assert_eq!(site.feed_url().as_str(), "http://localhost:8000/feeds/");
        assert_eq!(
            site.trackback_url(7).as_str(),
            "http://localhost:8000/trackback/7/"
        );
    }

    #[test]
    fn resolves_detail_routes() {
        let route = site().resolve(&url("http://localhost:8000/2010/01/01/my-first-nodetype/"));
        assert_eq!(
            route,
            Route::Detail(Permalink {
                date: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
                slug: "my-first-nodetype".into(),
            })
        );
        assert_eq!(
            site().resolve(&url("http://localhost:8000/2010/02/31/impossible/")),
            Route::NotFound
        );
    }

    #[test]
    fn resolves_listing_and_missing_routes() {
        let site = site();
        for listing in [
            "http://localhost:8000/",
            "http://localhost:8000/2010/",
            "http://localhost:8000/2010/01/",
            "http://localhost:8000/2010/01/01/",
            "http://localhost:8000/tags/gstudio/",
            "http://localhost:8000/feeds/",
        ] {
            assert_eq!(site.resolve(&url(listing)), Route::Listing, "{listing}");
        }
        assert_eq!(
            site.resolve(&url("http://localhost:8000/error-404/")),
            Route::NotFound
        );
        assert_eq!(site.resolve(&url("http://example.com/")), Route::Foreign);
        assert_eq!(site.resolve(&url("https://localhost:8000/")), Route::Foreign);
    }

    #[test]
    fn honours_a_base_path() {
        let site = Site::new(url("https://example.org/blog"), "Blog", "feeds/");
        assert_eq!(site.base_url().as_str(), "https://example.org/blog/");
        assert_eq!(
            site.permalink(&item()).as_str(),
            "https://example.org/blog/2010/01/01/my-first-nodetype/"
        );
        assert!(matches!(
            site.resolve(&url("https://example.org/blog/2010/01/01/my-first-nodetype/")),
            Route::Detail(_)
        ));
        assert_eq!(site.resolve(&url("https://example.org/blog/")), Route::Listing);
        assert_eq!(
            site.resolve(&url("https://example.org/2010/01/01/my-first-nodetype/")),
            Route::NotFound
        );
        assert_eq!(site.resolve(&url("https://example.org/blogger/")), Route::NotFound);
    }
}
