use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Labels pulled from the post body, in the order they are rendered.
pub const KEYWORDS: &[&str] = &[
    "Season:",
    "Genre:",
    "Network:",
    "Org. run:",
    "Running time:",
    "Language:",
    "Quality:",
];

static KEYWORD_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    KEYWORDS
        .iter()
        .map(|kw| Regex::new(&format!("(?i){}[^\r\n]*", regex::escape(kw))).unwrap())
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataLine {
    pub label: String,
    /// Line as rendered into the post: the matched run, or "<label> N/A".
    pub text: String,
    pub found: bool,
}

impl MetadataLine {
    fn placeholder(label: &str) -> Self {
        Self {
            label: label.to_string(),
            text: format!("{} N/A", label),
            found: false,
        }
    }
}

/// One entry per keyword in `KEYWORDS`, in that order. Missing labels degrade
/// to placeholders.
pub fn extract(raw_text: &str) -> Vec<MetadataLine> {
    KEYWORDS
        .iter()
        .zip(KEYWORD_RES.iter())
        .map(|(label, re)| {
            re.find(raw_text)
                .map(|m| MetadataLine {
                    label: label.to_string(),
                    text: m.as_str().trim().to_string(),
                    found: true,
                })
                .unwrap_or_else(|| MetadataLine::placeholder(label))
        })
        .collect()
}
