use clap::Parser;
use site_shot::SiteShot;
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();

    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!("Starting crawl for: {}", config.start_url);
    println!("Note: capturing pages requires a WebDriver server (e.g., chromedriver).");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using {}",
        config.webdriver_url
    );

    let out_dir = config.out_dir.clone();
    let summary = match SiteShot::new(&config.start_url).with_config(config).run().await {
        Ok(summary) => summary,
        Err(e) => {
            ::log::error!("Crawl aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Captured {} of {} pages in {:.2} seconds, results in {}",
        summary.success,
        summary.total,
        summary.elapsed.as_secs_f64(),
        out_dir.display()
    );

    if args.strict && summary.has_failures() {
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}
