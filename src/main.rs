use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use media_link_resolver_lib::resolver::LogProgress;
use media_link_resolver_lib::{detect_platform, MediaResolver, ResolverConfig};

/// Resolve a TikTok, Instagram or Pinterest link into a deliverable media
/// payload and print it as JSON
#[derive(Debug, Parser)]
#[command(name = "media-link-resolver", version)]
struct Cli {
    /// Message text containing the link
    #[arg(required = true)]
    text: Vec<String>,

    /// Autolink API key (overrides AUTOLINK_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Path to gallery-dl (overrides GALLERY_DL_PATH)
    #[arg(long)]
    gallery_dl: Option<String>,

    /// Proxy for probes and API calls, e.g. socks5h://127.0.0.1:1080
    #[arg(long)]
    proxy: Option<String>,

    /// Seconds allowed for one gallery-dl run
    #[arg(long)]
    process_timeout: Option<u64>,

    /// Pretty-print the JSON outcome
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ResolverConfig::from_env();
    if cli.api_key.is_some() {
        config = config.with_api_key(cli.api_key);
    }
    if cli.gallery_dl.is_some() {
        config = config.with_gallery_dl_path(cli.gallery_dl);
    }
    if cli.proxy.is_some() {
        config = config.with_proxy(cli.proxy);
    }
    if let Some(secs) = cli.process_timeout {
        config = config.with_process_timeout(Duration::from_secs(secs));
    }

    let text = cli.text.join(" ");
    let Some(link) = detect_platform(&text) else {
        tracing::error!("this link format or platform is not supported");
        return ExitCode::from(2);
    };

    let resolver = match MediaResolver::new(config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "failed to set up resolver");
            return ExitCode::FAILURE;
        }
    };

    let outcome = resolver.resolve_link(&link, Some(&LogProgress)).await;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string(&outcome)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize outcome");
            return ExitCode::FAILURE;
        }
    }

    if outcome.is_deliverable() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
