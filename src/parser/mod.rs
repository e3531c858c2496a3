pub mod metadata;
pub mod title;

use metadata::MetadataLine;
use title::NormalizedTitle;

use crate::source::SourceArticle;

/// Everything derived from a scraped article before it is composed.
#[derive(Debug, Clone)]
pub struct ParsedArticle {
    pub title: NormalizedTitle,
    pub metadata: Vec<MetadataLine>,
}

/// Two independent passes: heading → normalized title, body text → metadata lines.
pub fn process_article(article: &SourceArticle) -> ParsedArticle {
    ParsedArticle {
        title: title::normalize(&article.title),
        metadata: metadata::extract(&article.raw_text),
    }
}
