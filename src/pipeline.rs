use anyhow::Result;
use tracing::{error, info};

use crate::compose::compose;
use crate::config::Credentials;
use crate::parser::process_article;
use crate::source::{fetch_latest_article, SourceFetcher};
use crate::target::TargetSite;
use crate::workflow::{Post, PublishResult, PublishWorkflow, RunReport, WorkflowOptions};

/// Scrape the newest article and turn it into a post. `Ok(None)` when the
/// source lists no article.
pub async fn prepare(fetcher: &dyn SourceFetcher, source_url: &str) -> Result<Option<Post>> {
    let Some(article) = fetch_latest_article(fetcher, source_url).await? else {
        return Ok(None);
    };

    let parsed = process_article(&article);
    info!("Found: {}", parsed.title.canonical_title);
    let missing = parsed.metadata.iter().filter(|l| !l.found).count();
    if missing > 0 {
        info!("{} metadata line(s) missing, using N/A", missing);
    }

    Ok(Some(Post {
        body: compose(&article.image_url, &parsed.metadata),
        source_link: article.link,
        title: parsed.title,
        metadata: parsed.metadata,
        image_url: article.image_url,
    }))
}

/// One full run: scrape, compose, publish. Never returns an error; every
/// failure ends up in the report.
pub async fn run(
    fetcher: &dyn SourceFetcher,
    source_url: &str,
    target: &mut dyn TargetSite,
    credentials: &Credentials,
    options: &WorkflowOptions,
) -> RunReport {
    let report = RunReport::start();

    let post = match prepare(fetcher, source_url).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            info!("No articles found.");
            return report.finish(PublishResult::NoArticle);
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            error!("Scraping failed: {}", reason);
            return report.finish(PublishResult::Failed(reason));
        }
    };

    PublishWorkflow::new(target, credentials, options, report)
        .run(&post)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::{fixture, FakeFetcher, HOME_URL, POST_URL};
    use crate::workflow::tests::{credentials, instant_options, FakeTarget};

    fn source() -> FakeFetcher {
        FakeFetcher::default()
            .page(HOME_URL, &fixture("home"))
            .page(POST_URL, &fixture("post"))
    }

    #[tokio::test]
    async fn prepare_composes_post() {
        let post = prepare(&source(), HOME_URL).await.unwrap().unwrap();
        assert_eq!(post.title.canonical_title, "Demon Hunter (Season 2)");
        assert_eq!(post.title.subtitle, "Multi Audio [Eng-Jap]");
        assert!(post.metadata.iter().all(|l| l.found));
        let body = post.body.as_str();
        assert!(body.contains("Network: Crunchyroll"));
        assert!(body.contains(r#"src="https://source.test/wp-content/uploads/demon-hunter-s2.jpg""#));
    }

    #[tokio::test]
    async fn no_article_never_authenticates() {
        let fetcher = FakeFetcher::default().page(HOME_URL, &fixture("home_empty"));
        let mut target = FakeTarget::default();
        let report = run(&fetcher, HOME_URL, &mut target, &credentials(), &instant_options()).await;

        assert_eq!(report.result, PublishResult::NoArticle);
        assert!(target.calls.is_empty());
    }

    #[tokio::test]
    async fn source_failure_never_authenticates() {
        let fetcher = FakeFetcher::default().page(HOME_URL, &fixture("home"));
        let mut target = FakeTarget::default();
        let report = run(&fetcher, HOME_URL, &mut target, &credentials(), &instant_options()).await;

        assert!(matches!(report.result, PublishResult::Failed(_)));
        assert!(target.calls.is_empty());
    }

    #[tokio::test]
    async fn duplicate_end_to_end() {
        let mut target = FakeTarget {
            search_page: "<td><a class=\"row-title\">Demon Hunter (Season 2)</a></td>".into(),
            ..FakeTarget::default()
        };
        let report = run(&source(), HOME_URL, &mut target, &credentials(), &instant_options()).await;

        assert_eq!(report.result, PublishResult::SkippedDuplicate);
        assert!(!target.called("open_editor"));
        assert!(target.closed);
    }

    #[tokio::test]
    async fn login_timeout_end_to_end() {
        let mut target = FakeTarget {
            login_ok: false,
            ..FakeTarget::default()
        };
        let report = run(&source(), HOME_URL, &mut target, &credentials(), &instant_options()).await;

        assert_eq!(report.result, PublishResult::Failed("login failed".into()));
        assert!(!target.called("search_posts"));
        assert!(target.closed);
    }

    #[tokio::test]
    async fn publishes_end_to_end() {
        let mut target = FakeTarget::default();
        let report = run(&source(), HOME_URL, &mut target, &credentials(), &instant_options()).await;

        assert_eq!(report.result, PublishResult::Published);
        assert!(target.called("set_featured_image https://source.test/wp-content/uploads/demon-hunter-s2.jpg"));
        assert!(target.called("set_field subtitle=Multi Audio [Eng-Jap]"));
    }
}
