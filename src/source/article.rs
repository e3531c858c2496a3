use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

/// Heading and link of an entry on the source home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleListing {
    pub title: String,
    pub link: String,
}

/// What the post page contributes: poster image and plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostBody {
    pub image_url: String,
    pub text: String,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {:?}: {}", css, e))
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First `article` on the page. `Ok(None)` when there is none; an article
/// without a heading or link is malformed and reported as an error.
pub fn first_listing(html: &str, page_url: &str) -> Result<Option<ArticleListing>> {
    let document = Html::parse_document(html);
    let Some(article) = document.select(&selector("article")?).next() else {
        return Ok(None);
    };

    let mut heading = None;
    for css in ["h2", "h1, h3"] {
        heading = article.select(&selector(css)?).next();
        if heading.is_some() {
            break;
        }
    }
    let title = heading
        .map(text_of)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("First article on {} has no heading", page_url))?;

    let href = article
        .select(&selector("a[href]")?)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| anyhow!("First article on {} has no link", page_url))?;
    let link = Url::parse(page_url)
        .and_then(|base| base.join(href.trim()))
        .with_context(|| format!("Bad article link {:?}", href))?
        .to_string();

    Ok(Some(ArticleListing { title, link }))
}

/// Image and text of the `.entry-content` container. A page without the
/// container degrades to an empty body.
pub fn post_body(html: &str) -> Result<PostBody> {
    let document = Html::parse_document(html);
    let Some(content) = document.select(&selector("div.entry-content")?).next() else {
        tracing::warn!("Post page has no .entry-content container");
        return Ok(PostBody::default());
    };

    let image_url = content
        .select(&selector("img[src]")?)
        .next()
        .and_then(|img| img.value().attr("src"))
        .unwrap_or_default()
        .to_string();

    let mut text = String::new();
    push_lines(content, &mut text);
    Ok(PostBody {
        image_url,
        text: text.trim().to_string(),
    })
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote",
];

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Plain text with `br` and block elements turned into line breaks, so a
/// `Label: value<br>Label: value` run stays one label per line.
fn push_lines(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if name == "br" {
            out.push('\n');
            continue;
        }
        let block = BLOCK_TAGS.contains(&name);
        if block {
            end_line(out);
        }
        push_lines(child, out);
        if block {
            end_line(out);
        }
    }
}
