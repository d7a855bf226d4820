//! mvr-sniffer - record the MVR portal's network traffic from a real browser
//!
//! Opens the service page in Chromium, prints every non-static request and
//! response while an operator fills in the form by hand, and saves the
//! traffic plus screenshots for later analysis.

mod capture;
mod error;
mod inspect;
mod recorder;

use anyhow::{Context, Result};
use capture::TrafficLog;
use chromiumoxide::browser::{Browser, BrowserConfig};
use clap::Parser;
use futures::StreamExt;
use mvr_core::ClientConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Parser)]
#[command(name = "mvr-sniffer")]
#[command(author, version, about = "Record MVR portal traffic from a browser session")]
struct Cli {
    /// Page to open (defaults to the document status service page)
    #[arg(long)]
    url: Option<String>,

    /// Directory for captured traffic and screenshots
    #[arg(long, default_value = "captured_data")]
    output_dir: PathBuf,

    /// Run without a visible browser window
    #[arg(long)]
    headless: bool,

    /// Seconds to let the first page settle
    #[arg(long, default_value_t = 5)]
    settle_secs: u64,

    /// Seconds for the operator to navigate to the form
    #[arg(long, default_value_t = 20)]
    navigate_secs: u64,

    /// Seconds for the operator to fill in and submit the form
    #[arg(long, default_value_t = 60)]
    interact_secs: u64,

    /// EGN to show as test data
    #[arg(long, default_value = "<YOUR_EGN>")]
    egn: String,

    /// Surname to show as test data
    #[arg(long, default_value = "<YOUR_LAST_NAME>")]
    surname: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "info,mvr=debug" } else { "warn,mvr=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn target_url(cli: &Cli) -> Result<Url> {
    if let Some(url) = &cli.url {
        return Url::parse(url).with_context(|| format!("Invalid URL: {url}"));
    }
    let config = ClientConfig::default();
    let base = Url::parse(&config.base_url).context("Invalid default base URL")?;
    base.join(&config.service_path)
        .context("Invalid default service path")
}

fn print_rule() {
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_instructions(cli: &Cli) {
    println!();
    print_rule();
    println!("MANUAL INTERACTION REQUIRED");
    print_rule();
    println!("\n   Test Data:");
    println!("   - ЕГН: {}", cli.egn);
    println!("   - Last Name: {}", cli.surname);
    println!("\n   Please:");
    println!("   1. Fill in the form with the test data above");
    println!("   2. Solve any CAPTCHA if present");
    println!("   3. Submit the form");
    println!("   4. Wait for results to load");
    println!("\n   All API calls are being captured.");
    println!("   Waiting for {} seconds...\n", cli.interact_secs);
    print_rule();
}

async fn launch(headless: bool) -> Result<Browser> {
    let mut builder = BrowserConfig::builder().no_sandbox();
    if !headless {
        builder = builder.with_head();
    }
    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch Chromium")?;

    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!("Browser handler error: {}", e);
            }
        }
    });

    Ok(browser)
}

async fn sniff(cli: &Cli, browser: &Browser, log: &TrafficLog) -> Result<()> {
    let output_dir = cli.output_dir.as_path();
    let url = target_url(cli)?;

    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to open page")?;
    let recorder = recorder::start_recording(&page, log.clone()).await?;

    println!("\nNavigating to: {url}");
    page.goto(url.as_str())
        .await
        .map_err(|e| error::SnifferError::Navigation(e.to_string()))?;
    page.wait_for_navigation().await.ok();

    println!("\nWaiting for page to fully load ({} seconds)...", cli.settle_secs);
    sleep(Duration::from_secs(cli.settle_secs)).await;

    println!("\nPlease click on the button/link that says:");
    println!("   - 'Заявяване' (Apply)");
    println!("   - 'Стартирай услугата' (Start Service)");
    println!("   - Or any link to e-uslugi.mvr.bg");
    println!("   This will take you to the actual form.");

    println!(
        "\nWaiting {} seconds for you to navigate to the form...",
        cli.navigate_secs
    );
    sleep(Duration::from_secs(cli.navigate_secs)).await;

    println!("\nLooking for form fields...");
    match inspect::inspect_form(&page, Duration::from_secs(5)).await {
        Ok(report) => {
            println!("\n{}", report.render());
            print_instructions(cli);
            sleep(Duration::from_secs(cli.interact_secs)).await;
        }
        Err(e) => {
            println!("\nError analyzing form: {e}");
            println!("   Taking screenshot for debugging...");
            screenshot_or_warn(&page, &output_dir.join("page_screenshot.png")).await;
        }
    }

    println!("\nTaking final screenshot...");
    screenshot_or_warn(&page, &output_dir.join("final_screenshot.png")).await;

    recorder.abort();
    Ok(())
}

async fn screenshot_or_warn(page: &chromiumoxide::Page, path: &Path) {
    if let Err(e) = inspect::screenshot(page, path).await {
        tracing::warn!("{}", e);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;

    let mut browser = launch(cli.headless).await?;
    let log = TrafficLog::new();

    let outcome = sniff(&cli, &browser, &log).await;

    if let Err(e) = browser.close().await {
        tracing::debug!("Browser close failed: {}", e);
    }

    println!("\nSaving captured traffic...");
    log.save(&cli.output_dir)?;

    println!(
        "\nCaptured {} requests and {} responses",
        log.requests().len(),
        log.responses().len()
    );
    println!("\nFiles saved in: {}", cli.output_dir.display());
    println!("   - captured_requests.json");
    println!("   - captured_responses.json");
    println!("   - page_screenshot.png");
    println!("   - final_screenshot.png");

    outcome
}
