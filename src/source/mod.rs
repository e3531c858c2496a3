pub mod article;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::{info, warn};

pub const DEFAULT_SOURCE_URL: &str = "https://toonworld4all.me/";
const SOURCE_USER_AGENT: &str = "Mozilla/5.0";

/// Raw response of a single page fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub html: String,
}

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Single-attempt fetches over reqwest with transport-default timeouts.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, SOURCE_USER_AGENT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let html = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(FetchedPage { url, status, html })
    }
}

/// The newest article as scraped from the source site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArticle {
    pub title: String,
    pub link: String,
    pub image_url: String,
    pub raw_text: String,
}

async fn fetch_ok(fetcher: &dyn SourceFetcher, url: &str) -> Result<FetchedPage> {
    let page = fetcher.fetch(url).await?;
    if !(200..300).contains(&page.status) {
        bail!("{} returned HTTP {}", url, page.status);
    }
    Ok(page)
}

/// Fetch the home page, follow its first article and scrape the post body.
/// `Ok(None)` when the home page lists no article at all.
pub async fn fetch_latest_article(
    fetcher: &dyn SourceFetcher,
    source_url: &str,
) -> Result<Option<SourceArticle>> {
    info!("Scraping source {}", source_url);
    let home = fetch_ok(fetcher, source_url).await?;

    let Some(listing) = article::first_listing(&home.html, &home.url)? else {
        return Ok(None);
    };
    info!("Newest article: {} ({})", listing.title, listing.link);

    let post = fetch_ok(fetcher, &listing.link).await?;
    let body = article::post_body(&post.html)?;
    if body.image_url.is_empty() {
        warn!("No image in {}", listing.link);
    }

    Ok(Some(SourceArticle {
        title: listing.title,
        link: listing.link,
        image_url: body.image_url,
        raw_text: body.text,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned pages and remembers which URLs were asked for.
    #[derive(Default)]
    pub struct FakeFetcher {
        pages: HashMap<String, (u16, String)>,
        pub requested: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), (200, html.to_string()));
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), (status, String::new()));
            self
        }
    }

    #[async_trait]
    impl SourceFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.requested.lock().unwrap().push(url.to_string());
            let (status, html) = self
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("connection refused: {}", url))?;
            Ok(FetchedPage {
                url: url.to_string(),
                status,
                html,
            })
        }
    }

    pub fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    pub const HOME_URL: &str = "https://source.test/";
    pub const POST_URL: &str = "https://source.test/demon-hunter-season-2-multi-audio/";

    #[tokio::test]
    async fn follows_first_article() {
        let fetcher = FakeFetcher::default()
            .page(HOME_URL, &fixture("home"))
            .page(POST_URL, &fixture("post"));

        let article = fetch_latest_article(&fetcher, HOME_URL).await.unwrap().unwrap();
        assert_eq!(article.title, "Demon Hunter Season 2 Multi Audio [Eng-Jap]");
        assert_eq!(article.link, POST_URL);
        assert_eq!(
            article.image_url,
            "https://source.test/wp-content/uploads/demon-hunter-s2.jpg"
        );
        assert!(article.raw_text.contains("Genre: Action, Dark Fantasy"));
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![HOME_URL, POST_URL]);
    }

    #[tokio::test]
    async fn empty_home_is_none() {
        let fetcher = FakeFetcher::default().page(HOME_URL, &fixture("home_empty"));
        let article = fetch_latest_article(&fetcher, HOME_URL).await.unwrap();
        assert!(article.is_none());
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let fetcher = FakeFetcher::default().status(HOME_URL, 503);
        let err = fetch_latest_article(&fetcher, HOME_URL).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
