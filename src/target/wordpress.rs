use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::TargetSite;
use crate::config::{AdminUrls, Credentials};

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Lazily loaded meta boxes sit at the bottom of the editor.
const FIELD_REVEAL_DELAY: Duration = Duration::from_secs(2);
const SCROLL_TOP_DELAY: Duration = Duration::from_secs(1);

const LOGIN_USER: &str = "#user_login";
const LOGIN_PASS: &str = "#user_pass";
const LOGIN_SUBMIT: &str = "#wp-submit";
const ADMIN_MENU: &str = "#adminmenu";
const SEARCH_INPUT: &str = "#post-search-input";
const TITLE_FIELD: &str = "[name='post_title']";
const TEXT_TAB: &str = "#content-html";
const CONTENT_FIELD: &str = "#content";
const FEATURED_IMAGE_URL: &str = "#fifu_input_url";
const PUBLISH_BUTTON: &str = "#publish";
const PUBLISHED_NOTICE: &str = "#message.updated";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            wait_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(250),
        }
    }
}

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

impl Session {
    async fn launch(options: &BrowserOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .no_sandbox()
            .arg("--disable-dev-shm-usage");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(|e| anyhow!("Bad browser config: {}", e))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .context("Failed to launch Chrome")?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        page.set_user_agent(CHROME_USER_AGENT).await?;
        Ok(Self {
            browser,
            handler,
            page,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Drives the classic WordPress admin through headless Chrome.
pub struct WpAdmin {
    urls: AdminUrls,
    options: BrowserOptions,
    session: Option<Session>,
    fields_revealed: bool,
}

impl WpAdmin {
    pub fn new(urls: AdminUrls, options: BrowserOptions) -> Self {
        Self {
            urls,
            options,
            session: None,
            fields_revealed: false,
        }
    }

    fn page(&self) -> Result<&Page> {
        self.session
            .as_ref()
            .map(|s| &s.page)
            .ok_or_else(|| anyhow!("No browser session; log in first"))
    }

    async fn goto(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        self.page()?
            .goto(url)
            .await
            .with_context(|| format!("Failed to open {}", url))?;
        Ok(())
    }

    /// Poll until `css` matches or the wait timeout elapses.
    async fn wait_for(&self, css: &str) -> Result<Option<Element>> {
        let page = self.page()?;
        let deadline = Instant::now() + self.options.wait_timeout;
        loop {
            if let Ok(el) = page.find_element(css).await {
                return Ok(Some(el));
            }
            if Instant::now() >= deadline {
                debug!("Timed out waiting for {}", css);
                return Ok(None);
            }
            sleep(self.options.poll_interval).await;
        }
    }

    async fn find(&self, css: &str) -> Result<Option<Element>> {
        Ok(self.page()?.find_element(css).await.ok())
    }

    async fn eval(&self, script: String) -> Result<serde_json::Value> {
        let mut params = EvaluateParams::new(script);
        params.return_by_value = Some(true);
        let result = self.page()?.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or_default())
    }

    /// Assign `value` to the element's `value` property directly instead of
    /// typing it, so editors never see intermediate keystrokes.
    async fn assign_value(&self, css: &str, value: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             el.value = {}; el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true; }})()",
            serde_json::to_string(css)?,
            serde_json::to_string(value)?,
        );
        Ok(self.eval(script).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl TargetSite for WpAdmin {
    async fn submit_login(&mut self, credentials: &Credentials) -> Result<()> {
        if self.session.is_none() {
            self.session = Some(Session::launch(&self.options).await?);
        }
        self.goto(&self.urls.login).await?;

        let user = self
            .wait_for(LOGIN_USER)
            .await?
            .ok_or_else(|| anyhow!("Login form did not appear at {}", self.urls.login))?;
        user.click().await?;
        user.type_str(&credentials.username).await?;

        let pass = self.page()?.find_element(LOGIN_PASS).await?;
        pass.click().await?;
        pass.type_str(&credentials.password).await?;

        self.page()?.find_element(LOGIN_SUBMIT).await?.click().await?;
        Ok(())
    }

    async fn await_login(&mut self) -> Result<bool> {
        Ok(self.wait_for(ADMIN_MENU).await?.is_some())
    }

    async fn search_posts(&mut self, query: &str) -> Result<String> {
        // load the filtered list directly; goto returns once it has loaded
        let url = self.urls.search(query)?;
        self.goto(&url).await?;

        if self.wait_for(SEARCH_INPUT).await?.is_none() {
            bail!("Post search box did not appear at {}", url);
        }
        Ok(self.page()?.content().await?)
    }

    async fn open_editor(&mut self) -> Result<()> {
        self.fields_revealed = false;
        self.goto(&self.urls.new_post).await
    }

    async fn set_title(&mut self, title: &str) -> Result<()> {
        if self.wait_for(TITLE_FIELD).await?.is_none() {
            bail!("Title field did not appear in the editor");
        }
        if !self.assign_value(TITLE_FIELD, title).await? {
            bail!("Title field vanished before it could be set");
        }
        Ok(())
    }

    async fn set_raw_body(&mut self, body: &str) -> Result<bool> {
        // classic editor "Text" tab; without it TinyMCE rewrites the shortcodes
        let Some(tab) = self.find(TEXT_TAB).await? else {
            return Ok(false);
        };
        tab.click().await?;
        self.assign_value(CONTENT_FIELD, body).await
    }

    async fn set_field(&mut self, name_fragment: &str, value: &str) -> Result<bool> {
        if !self.fields_revealed {
            self.eval("window.scrollTo(0, document.body.scrollHeight);".to_string())
                .await?;
            sleep(FIELD_REVEAL_DELAY).await;
            self.fields_revealed = true;
        }

        let css = format!("input[name*={}]", serde_json::to_string(name_fragment)?);
        let inputs = self.page()?.find_elements(css).await?;
        let Some(input) = inputs.first() else {
            return Ok(false);
        };
        input.click().await?;
        input.type_str(value).await?;
        Ok(true)
    }

    async fn set_featured_image(&mut self, url: &str) -> Result<bool> {
        let Some(input) = self.find(FEATURED_IMAGE_URL).await? else {
            return Ok(false);
        };
        input.click().await?;
        input.type_str(url).await?;
        Ok(true)
    }

    async fn publish(&mut self) -> Result<()> {
        self.eval("window.scrollTo(0, 0);".to_string()).await?;
        sleep(SCROLL_TOP_DELAY).await;

        if self.find(PUBLISH_BUTTON).await?.is_none() {
            bail!("Publish button not found");
        }
        // a JS click still lands when an admin notice overlaps the button
        self.eval(format!(
            "document.querySelector({}).click();",
            serde_json::to_string(PUBLISH_BUTTON)?
        ))
        .await?;
        Ok(())
    }

    async fn confirm_published(&mut self) -> Result<bool> {
        Ok(self.wait_for(PUBLISHED_NOTICE).await?.is_some())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        if let Err(e) = session.browser.close().await {
            warn!("Browser close failed: {}", e);
            if let Some(Err(e)) = session.browser.kill().await {
                warn!("Failed to kill Chrome, process may be left running: {}", e);
            }
            return Ok(());
        }
        session.browser.wait().await?;
        Ok(())
    }
}
