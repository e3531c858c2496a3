mod compose;
mod config;
mod parser;
mod pipeline;
mod source;
mod target;
mod workflow;

use std::time::{Duration, Instant};

use anyhow::bail;
use clap::{Parser, Subcommand};

use source::{HttpFetcher, DEFAULT_SOURCE_URL};
use target::wordpress::{BrowserOptions, WpAdmin};
use workflow::{PublishResult, RunReport, StepOutcome, WorkflowOptions, DEFAULT_RATING};

#[derive(Parser)]
#[command(name = "autopost", about = "Republish the newest source article as a WordPress post")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the newest article and publish it unless it already exists
    Run {
        /// WordPress login page, e.g. https://example.com/wp-login.php
        #[arg(long, env = "WP_URL")]
        wp_url: Option<String>,
        #[arg(long, env = "WP_USERNAME")]
        wp_username: Option<String>,
        #[arg(long, env = "WP_PASSWORD", hide_env_values = true)]
        wp_password: Option<String>,
        #[arg(long, env = "SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
        source_url: String,
        /// Value typed into the theme's review score field ("" to leave it empty)
        #[arg(long, default_value = DEFAULT_RATING)]
        rating: String,
        /// Seconds to wait for admin page elements
        #[arg(long, env = "WAIT_TIMEOUT_SECS", default_value = "20")]
        wait_timeout: u64,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scrape and compose without touching WordPress
    Preview {
        #[arg(long, env = "SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
        source_url: String,
        #[arg(long)]
        json: bool,
    },
    /// Normalize a single title
    Title { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            wp_url,
            wp_username,
            wp_password,
            source_url,
            rating,
            wait_timeout,
            headful,
            json,
        } => {
            // secrets are checked before anything touches the network
            let config = config::Config::new(wp_url, wp_username, wp_password)?;

            let fetcher = HttpFetcher::new();
            let mut admin = WpAdmin::new(
                config.admin.clone(),
                BrowserOptions {
                    headless: !headful,
                    wait_timeout: Duration::from_secs(wait_timeout),
                    ..BrowserOptions::default()
                },
            );
            let options = WorkflowOptions {
                rating: Some(rating),
                ..WorkflowOptions::default()
            };

            let report =
                pipeline::run(&fetcher, &source_url, &mut admin, &config.credentials, &options)
                    .await;
            print_report(&report, json)?;

            match report.result {
                PublishResult::Failed(reason) => bail!("Run failed: {}", reason),
                _ => Ok(()),
            }
        }
        Commands::Preview { source_url, json } => {
            let fetcher = HttpFetcher::new();
            match pipeline::prepare(&fetcher, &source_url).await? {
                None => println!("No articles found."),
                Some(post) if json => println!("{}", serde_json::to_string_pretty(&post)?),
                Some(post) => {
                    println!("Source:   {}", post.source_link);
                    println!("Title:    {}", post.title.canonical_title);
                    println!("Subtitle: {}", post.title.subtitle);
                    println!("Image:    {}", post.image_url);
                    println!("\n{}", post.body);
                }
            }
            Ok(())
        }
        Commands::Title { text } => {
            let t = parser::title::normalize(&text);
            println!("Title:    {}", t.canonical_title);
            println!("Subtitle: {}", t.subtitle);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let title = report.title.as_deref().unwrap_or("-");
    let outcome = match &report.result {
        PublishResult::Published => "published".to_string(),
        PublishResult::SkippedDuplicate => "skipped (already posted)".to_string(),
        PublishResult::NoArticle => "nothing to publish".to_string(),
        PublishResult::Failed(reason) => format!("failed: {}", reason),
    };
    println!("{} | {}", title, outcome);
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Succeeded => println!("  {:<15} ok", step.step),
            StepOutcome::Skipped { reason } => println!("  {:<15} skipped: {}", step.step, reason),
        }
    }
    let skipped = report.skipped().count();
    if skipped > 0 {
        println!("{} optional step(s) skipped", skipped);
    }
    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
