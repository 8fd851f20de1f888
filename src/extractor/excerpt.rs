//! Plain-text snippet around a backlink, shown to the owner of the target page.

use scraper::{ElementRef, Node};
use url::Url;

use crate::extractor::document::SourceDocument;

const ELLIPSIS: &str = "...";

/// Excerpt of the text surrounding the first link to `target`.
///
/// The context is the text of the anchor's parent element with markup removed
/// and whitespace collapsed. Texts longer than `max_length` characters are cut
/// to a `max_length` window around the anchor, marked with `...` on each side
/// that lost text. An anchor shorter than the window always stays whole.
/// Returns an empty string when the document does not link to `target`.
pub fn excerpt(document: &SourceDocument, target: &Url, max_length: usize) -> String {
    let Some(anchor) = document.find_anchor(target) else {
        return String::new();
    };
    let context = anchor.parent().and_then(ElementRef::wrap).unwrap_or(anchor);
    AnchoredText::collect(context, anchor).window(max_length)
}

/// Collapsed text of an element plus the character span of one anchor in it.
#[derive(Debug, Default)]
struct AnchoredText {
    chars: Vec<char>,
    pending_space: bool,
    anchor_start: Option<usize>,
    anchor_end: Option<usize>,
    anchor_position: usize,
}

impl AnchoredText {
    fn collect(context: ElementRef<'_>, anchor: ElementRef<'_>) -> Self {
        let mut text = Self::default();
        for node in context.descendants() {
            if node.id() == anchor.id() {
                text.anchor_position = text.chars.len() + usize::from(text.pending_space);
            }
            let Node::Text(fragment) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| matches!(element.name(), "script" | "style"))
            });
            if hidden {
                continue;
            }
            let in_anchor = node.ancestors().any(|ancestor| ancestor.id() == anchor.id());
            text.push(fragment, in_anchor);
        }
        text
    }

    fn push(&mut self, fragment: &str, in_anchor: bool) {
        for ch in fragment.chars() {
            if ch.is_whitespace() {
                if !self.chars.is_empty() {
                    self.pending_space = true;
                }
                continue;
            }
            if self.pending_space {
                self.chars.push(' ');
                self.pending_space = false;
            }
            if in_anchor && self.anchor_start.is_none() {
                self.anchor_start = Some(self.chars.len());
            }
            self.chars.push(ch);
            if in_anchor {
                self.anchor_end = Some(self.chars.len());
            }
        }
    }

    /// `(start, end)` of the anchor text; an anchor without text is an empty
    /// span at the place it occurred.
    fn anchor_span(&self) -> (usize, usize) {
        let start = self
            .anchor_start
            .unwrap_or(self.anchor_position)
            .min(self.chars.len());
        (start, self.anchor_end.unwrap_or(start))
    }

    fn window(self, max_length: usize) -> String {
        let total = self.chars.len();
        if total <= max_length {
            return self.chars.into_iter().collect();
        }

        let (anchor_start, anchor_end) = self.anchor_span();
        let mut start = anchor_start.saturating_sub(max_length / 2);
        if anchor_end - anchor_start < max_length && start + max_length < anchor_end {
            start = anchor_end - max_length;
        }
        let start = start.min(total - max_length);
        let end = start + max_length;

        let mut out = String::with_capacity(max_length + 2 * ELLIPSIS.len());
        if start > 0 {
            out.push_str(ELLIPSIS);
        }
        out.extend(&self.chars[start..end]);
        if end < total {
            out.push_str(ELLIPSIS);
        }
        out
    }
}
