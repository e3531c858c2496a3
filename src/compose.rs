use std::fmt;

use serde::Serialize;

use crate::parser::metadata::MetadataLine;

pub const TOGGLE_OPEN: &str = r#"[toggle title="Info" state="open"]"#;
pub const TOGGLE_CLOSE: &str = "[/toggle]";

/// Post body in the target's shortcode markup. The toggle pair must stay
/// intact or the theme renders it as literal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContentBlock(String);

impl ContentBlock {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn compose(image_url: &str, lines: &[MetadataLine]) -> ContentBlock {
    let mut out = Vec::with_capacity(lines.len() + 3);
    out.push(TOGGLE_OPEN.to_string());
    out.push(format!(
        r#"<img class="alignnone size-medium" src="{}" width="592" height="841" />"#,
        image_url.replace('"', "&quot;")
    ));
    out.extend(lines.iter().map(|l| l.text.clone()));
    out.push(TOGGLE_CLOSE.to_string());
    ContentBlock(out.join("\n"))
}
