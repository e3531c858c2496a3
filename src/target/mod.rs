pub mod duplicate;
pub mod wordpress;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Credentials;

/// What the publish workflow needs from a target site, independent of how
/// the site is driven.
///
/// Methods returning `Ok(false)` mean the expected element was not there;
/// the caller decides whether that is fatal.
#[async_trait]
pub trait TargetSite: Send {
    /// Open the login page and submit the credentials. Acquires the session.
    async fn submit_login(&mut self, credentials: &Credentials) -> Result<()>;

    /// Bounded wait for the post-login marker.
    async fn await_login(&mut self) -> Result<bool>;

    /// Run a post search and return the result page source.
    async fn search_posts(&mut self, query: &str) -> Result<String>;

    async fn open_editor(&mut self) -> Result<()>;

    async fn set_title(&mut self, title: &str) -> Result<()>;

    /// Store the body verbatim, bypassing any rich-text editor.
    async fn set_raw_body(&mut self, body: &str) -> Result<bool>;

    /// Fill the first input whose name contains `name_fragment`.
    async fn set_field(&mut self, name_fragment: &str, value: &str) -> Result<bool>;

    async fn set_featured_image(&mut self, url: &str) -> Result<bool>;

    /// Trigger the publish action. Completion is checked separately.
    async fn publish(&mut self) -> Result<()>;

    /// Bounded wait for the "post published" notice.
    async fn confirm_published(&mut self) -> Result<bool>;

    /// Release the session. Safe to call when none was acquired.
    async fn close(&mut self) -> Result<()>;
}
