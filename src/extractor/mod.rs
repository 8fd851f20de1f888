pub mod document;
pub mod excerpt;
pub mod links;

#[cfg(test)]
mod tests;

pub use document::SourceDocument;
pub use excerpt::excerpt;
pub use links::{LinkExtractor, is_external, pingback_link, same_site};
