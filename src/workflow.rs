use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::compose::ContentBlock;
use crate::config::Credentials;
use crate::parser::metadata::MetadataLine;
use crate::parser::title::NormalizedTitle;
use crate::target::duplicate::{Duplicate, DuplicateChecker};
use crate::target::TargetSite;

/// Theme custom fields, matched by input-name substring.
const SUBTITLE_FIELD: &str = "subtitle";
const RATING_FIELD: &str = "taq_review_score";

pub const DEFAULT_RATING: &str = "8.5";

/// A composed post, ready for the target.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub source_link: String,
    pub title: NormalizedTitle,
    pub metadata: Vec<MetadataLine>,
    pub image_url: String,
    pub body: ContentBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum PublishResult {
    Published,
    SkippedDuplicate,
    /// Source listed nothing; the target was never contacted.
    NoArticle,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: &'static str,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Outcome of one run plus every step it went through.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub title: Option<String>,
    pub result: PublishResult,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    clock: Instant,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            title: None,
            result: PublishResult::NoArticle,
            steps: Vec::new(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            clock: Instant::now(),
        }
    }

    pub fn finish(mut self, result: PublishResult) -> Self {
        self.result = result;
        self.elapsed_ms = self.clock.elapsed().as_millis() as u64;
        self
    }

    fn record(&mut self, step: &'static str, outcome: StepOutcome) {
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub checker: DuplicateChecker,
    /// Empty or `None` leaves the rating field alone.
    pub rating: Option<String>,
    /// Pause after triggering publish, before looking for the notice.
    pub publish_settle: Duration,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            checker: DuplicateChecker::default(),
            rating: Some(DEFAULT_RATING.to_string()),
            publish_settle: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
enum State {
    Start,
    Authenticating,
    Authenticated,
    /// Holds the search-result page source.
    DuplicateCheck(String),
    Compose,
    FieldsSet,
    ImageSet,
    Published,
    Skip,
    Failed(String),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Start => "start",
            State::Authenticating => "authenticating",
            State::Authenticated => "authenticated",
            State::DuplicateCheck(_) => "duplicate_check",
            State::Compose => "compose",
            State::FieldsSet => "fields_set",
            State::ImageSet => "image_set",
            State::Published => "published",
            State::Skip => "skip",
            State::Failed(_) => "failed",
        }
    }

    fn outcome(&self) -> Option<PublishResult> {
        match self {
            State::Published => Some(PublishResult::Published),
            State::Skip => Some(PublishResult::SkippedDuplicate),
            State::Failed(reason) => Some(PublishResult::Failed(reason.clone())),
            _ => None,
        }
    }
}

/// Drives one post through a `TargetSite`:
///
/// ```text
/// Start → Authenticating → Authenticated → DuplicateCheck → Skip
///                                                          → Compose → FieldsSet → ImageSet → Published
/// ```
///
/// Any error moves to `Failed`. Only login, the title field and publishing
/// are hard requirements; the body mode switch, theme fields and featured
/// image are best-effort and show up as skipped steps in the report. Once
/// login has started the session is closed on every exit path.
pub struct PublishWorkflow<'a> {
    target: &'a mut dyn TargetSite,
    credentials: &'a Credentials,
    options: &'a WorkflowOptions,
    report: RunReport,
    session_acquired: bool,
}

impl<'a> PublishWorkflow<'a> {
    pub fn new(
        target: &'a mut dyn TargetSite,
        credentials: &'a Credentials,
        options: &'a WorkflowOptions,
        report: RunReport,
    ) -> Self {
        Self {
            target,
            credentials,
            options,
            report,
            session_acquired: false,
        }
    }

    pub async fn run(mut self, post: &Post) -> RunReport {
        self.report.title = Some(post.title.canonical_title.clone());

        let mut state = State::Start;
        let result = loop {
            if let Some(result) = state.outcome() {
                break result;
            }
            let from = state.name();
            state = match self.advance(state, post).await {
                Ok(next) => next,
                Err(e) => {
                    let reason = format!("{:#}", e);
                    error!("Error while {}: {}", from, reason);
                    State::Failed(reason)
                }
            };
            debug!("{} -> {}", from, state.name());
        };

        if self.session_acquired {
            match self.target.close().await {
                Ok(()) => debug!("Browser session closed"),
                Err(e) => warn!("Failed to close browser session: {:#}", e),
            }
        }
        self.report.finish(result)
    }

    async fn advance(&mut self, state: State, post: &Post) -> Result<State> {
        let title = &post.title.canonical_title;
        match state {
            State::Start => {
                info!("Logging into WordPress...");
                self.session_acquired = true;
                self.target.submit_login(self.credentials).await?;
                Ok(State::Authenticating)
            }
            State::Authenticating => {
                if !self.target.await_login().await? {
                    error!("Login failed or timed out.");
                    return Ok(State::Failed("login failed".to_string()));
                }
                self.report.record("login", StepOutcome::Succeeded);
                Ok(State::Authenticated)
            }
            State::Authenticated => {
                info!("Searching existing posts for {:?}", title);
                let page = self.target.search_posts(title).await?;
                Ok(State::DuplicateCheck(page))
            }
            State::DuplicateCheck(page) => {
                self.report.record("duplicate_check", StepOutcome::Succeeded);
                if self.options.checker.check(&page, title) == Duplicate::Found {
                    info!("Post already exists. Skipping.");
                    return Ok(State::Skip);
                }

                info!("Creating new post...");
                self.target.open_editor().await?;
                self.target.set_title(title).await?;
                self.report.record("title", StepOutcome::Succeeded);

                let body = self.target.set_raw_body(post.body.as_str()).await;
                self.best_effort(
                    "raw_body",
                    body,
                    "text tab not found; is the Classic Editor plugin active?",
                );
                Ok(State::Compose)
            }
            State::Compose => {
                let subtitle = &post.title.subtitle;
                if subtitle.is_empty() {
                    self.skip("subtitle", "title has no subtitle");
                } else {
                    let r = self.target.set_field(SUBTITLE_FIELD, subtitle).await;
                    self.best_effort("subtitle", r, "no subtitle field in the editor");
                }

                match self.options.rating.as_deref().filter(|r| !r.is_empty()) {
                    Some(rating) => {
                        let r = self.target.set_field(RATING_FIELD, rating).await;
                        self.best_effort("rating", r, "no rating field in the editor");
                    }
                    None => self.skip("rating", "no rating configured"),
                }
                Ok(State::FieldsSet)
            }
            State::FieldsSet => {
                if post.image_url.is_empty() {
                    self.skip("featured_image", "source post has no image");
                } else {
                    let r = self.target.set_featured_image(&post.image_url).await;
                    self.best_effort(
                        "featured_image",
                        r,
                        "featured-image URL field not found; is the FIFU plugin installed?",
                    );
                }
                Ok(State::ImageSet)
            }
            State::ImageSet => {
                info!("Publishing...");
                self.target.publish().await?;
                sleep(self.options.publish_settle).await;
                if !self.target.confirm_published().await? {
                    bail!("publish not confirmed");
                }
                self.report.record("publish", StepOutcome::Succeeded);
                info!("Done! Published {:?}", title);
                Ok(State::Published)
            }
            terminal => Ok(terminal),
        }
    }

    fn skip(&mut self, step: &'static str, reason: &str) {
        debug!("Skipping {}: {}", step, reason);
        self.report.record(
            step,
            StepOutcome::Skipped {
                reason: reason.to_string(),
            },
        );
    }

    /// `Ok(false)` means the element was absent; errors are downgraded.
    fn best_effort(&mut self, step: &'static str, attempt: Result<bool>, missing: &str) {
        let outcome = match attempt {
            Ok(true) => StepOutcome::Succeeded,
            Ok(false) => {
                warn!("Could not set {}: {}", step, missing);
                StepOutcome::Skipped {
                    reason: missing.to_string(),
                }
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!("Could not set {}: {}", step, reason);
                StepOutcome::Skipped { reason }
            }
        };
        self.report.record(step, outcome);
    }
}
