//! Lectern CLI - LinkedIn Learning course downloader.

use anyhow::{Context, Result};
use clap::Parser;
use lectern::automation::ChromeSession;
use lectern::config::Config;
use lectern::console::Console;
use lectern::pipeline::{Pipeline, RunReport};
use std::path::PathBuf;

/// LinkedIn Learning course downloader.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Course slugs or URLs, learning path / collection URLs, or
    /// personal list URLs (me/saved, me/completed, me/in-progress).
    #[arg(required = true)]
    references: Vec<String>,

    /// Output directory (overrides the configured one).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    show_browser: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let console = Console::new();

    console.section("Lectern - Course Downloader");

    // Load configuration
    console.step("Loading configuration...");
    let mut config = Config::load().context("Failed to load configuration")?;

    // Check if this is first run (credentials not configured)
    if !config.account.is_configured() {
        let config_path = Config::config_path()?;
        console.warning(&format!(
            "Credentials not configured. Please edit: {}",
            config_path.display()
        ));
        console.info("Set your login email and password in the config file and run again.");
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;
    if args.show_browser {
        config.browser.headless = false;
    }
    let output_root = args
        .output
        .unwrap_or_else(|| config.paths.output_directory.clone());
    console.success("Configuration loaded");

    // One browser session is shared by the entire run
    console.step("Launching browser...");
    let session = ChromeSession::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;
    console.success("Browser ready");

    let outcome = run(&session, &config, output_root, &args.references, &console).await;

    // Best-effort teardown even when the run failed
    session.close().await;

    let report = outcome?;
    print_summary(&console, &report);
    Ok(())
}

async fn run(
    session: &ChromeSession,
    config: &Config,
    output_root: PathBuf,
    references: &[String],
    console: &Console,
) -> Result<RunReport> {
    console.step("Logging in...");
    session
        .login(&config.account.user, &config.account.password)
        .await
        .context("Login failed")?;
    console.success("Logged in successfully");

    let pipeline = Pipeline::new(session, config.download.clone(), output_root);
    pipeline.run(references).await
}

fn print_summary(console: &Console, report: &RunReport) {
    console.section("Run summary");
    console.info(&format!(
        "Courses attempted: {}",
        console.count(report.courses_attempted as usize)
    ));
    console.info(&format!(
        "Lessons downloaded: {}",
        console.count(report.lessons_downloaded as usize)
    ));
    console.info(&format!(
        "Already present: {}",
        console.count(report.lessons_skipped_existing as usize)
    ));

    let unreachable = report.lessons_unreachable + report.courses_unavailable;
    if unreachable > 0 {
        console.warning(&format!(
            "Unreachable: {} lesson(s), {} course(s)",
            report.lessons_unreachable, report.courses_unavailable
        ));
    } else {
        console.success("Nothing was unreachable");
    }
}
