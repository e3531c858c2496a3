use std::fmt;

use anyhow::{bail, Context, Result};
use reqwest::Url;

const LOGIN_PAGE: &str = "wp-login.php";
const POST_LIST_PAGE: &str = "wp-admin/edit.php";
const NEW_POST_PAGE: &str = "wp-admin/post-new.php";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Admin pages of the target site, derived from its login URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUrls {
    pub login: String,
    pub post_list: String,
    pub new_post: String,
}

impl AdminUrls {
    pub fn from_login_url(login_url: &str) -> Result<Self> {
        let login = Url::parse(login_url).with_context(|| format!("Invalid WP_URL {:?}", login_url))?;

        let (post_list, new_post) = if login_url.contains(LOGIN_PAGE) {
            (
                login_url.replace(LOGIN_PAGE, POST_LIST_PAGE),
                login_url.replace(LOGIN_PAGE, NEW_POST_PAGE),
            )
        } else {
            // site root given instead of the login page
            let mut base = login.clone();
            if !base.path().ends_with('/') {
                base.set_path(&format!("{}/", base.path()));
            }
            (
                base.join(POST_LIST_PAGE)?.to_string(),
                base.join(NEW_POST_PAGE)?.to_string(),
            )
        };

        Ok(Self {
            login: login.to_string(),
            post_list,
            new_post,
        })
    }

    /// Post list filtered by `?s=<query>`, as submitted by its search box.
    pub fn search(&self, query: &str) -> Result<String> {
        let mut url = Url::parse(&self.post_list)
            .with_context(|| format!("Invalid post list URL {:?}", self.post_list))?;
        url.query_pairs_mut().append_pair("s", query);
        Ok(url.to_string())
    }
}

/// Target-side settings required before a run may touch the network.
#[derive(Debug, Clone)]
pub struct Config {
    pub admin: AdminUrls,
    pub credentials: Credentials,
}

impl Config {
    pub fn new(
        login_url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(login_url), Some(username), Some(password)) =
            (present(login_url), present(username), present(password))
        else {
            bail!("Secrets are missing: WP_URL, WP_USERNAME and WP_PASSWORD must all be set");
        };

        Ok(Self {
            admin: AdminUrls::from_login_url(login_url.trim())?,
            credentials: Credentials { username, password },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn urls_from_login_page() {
        let urls = AdminUrls::from_login_url("https://blog.test/wp-login.php").unwrap();
        assert_eq!(urls.login, "https://blog.test/wp-login.php");
        assert_eq!(urls.post_list, "https://blog.test/wp-admin/edit.php");
        assert_eq!(urls.new_post, "https://blog.test/wp-admin/post-new.php");
    }

    #[test]
    fn urls_from_site_root_in_subdir() {
        let urls = AdminUrls::from_login_url("https://blog.test/anime").unwrap();
        assert_eq!(urls.post_list, "https://blog.test/anime/wp-admin/edit.php");
        assert_eq!(urls.new_post, "https://blog.test/anime/wp-admin/post-new.php");
    }

    #[test]
    fn search_url_encodes_title() {
        let urls = AdminUrls::from_login_url("https://blog.test/wp-login.php").unwrap();
        assert_eq!(
            urls.search("Demon Hunter (Season 2) & Co").unwrap(),
            "https://blog.test/wp-admin/edit.php?s=Demon+Hunter+%28Season+2%29+%26+Co"
        );
    }

    #[test]
    fn invalid_url_rejected() {
        assert!(AdminUrls::from_login_url("not a url").is_err());
    }

    #[test]
    fn all_secrets_required() {
        let url = some("https://blog.test/wp-login.php");
        assert!(Config::new(url.clone(), some("admin"), some("hunter2")).is_ok());
        assert!(Config::new(None, some("admin"), some("hunter2")).is_err());
        assert!(Config::new(url.clone(), None, some("hunter2")).is_err());
        assert!(Config::new(url, some("admin"), some("  ")).is_err());
    }

    #[test]
    fn password_not_in_debug() {
        let c = Config::new(
            some("https://blog.test/wp-login.php"),
            some("admin"),
            some("hunter2"),
        )
        .unwrap();
        let dbg = format!("{:?}", c);
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("hunter2"));
    }
}
