use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use freshfeed::channel::{self, ChannelList, StoreError};
use freshfeed::config::Config;
use freshfeed::feed::{
    aggregate_until, AggregateReport, Cutoff, Entry, FeedProfile, HttpFetcher, Source,
};
use freshfeed::util::validate_url;

/// Config directory (~/.config/freshfeed/) under the given home, if any.
fn config_dir_in(home: Option<OsString>) -> Option<PathBuf> {
    home.filter(|h| !h.is_empty())
        .map(|h| PathBuf::from(h).join(".config").join("freshfeed"))
}

/// Get the config directory path (~/.config/freshfeed/)
fn get_config_dir() -> Result<PathBuf> {
    config_dir_in(std::env::var_os("HOME")).context("HOME environment variable not set")
}

/// `--config` when given, else the default file under `home`.
///
/// `None` means there is no file to read and built-in defaults apply.
fn resolve_config_path(explicit: Option<PathBuf>, home: Option<OsString>) -> Option<PathBuf> {
    explicit.or_else(|| config_dir_in(home).map(|dir| dir.join("config.toml")))
}

/// Channel list path; only commands that use it need HOME.
fn channels_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("channels.json"))
}

#[derive(Parser, Debug)]
#[command(
    name = "freshfeed",
    about = "Recent entries from RSS/Atom feeds and video channels"
)]
struct Args {
    /// Config file (default: ~/.config/freshfeed/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fresh entries from the configured syndication feeds
    Feeds(WindowArgs),
    /// Fresh videos from the tracked channels
    Videos(WindowArgs),
    /// Manage tracked video channels
    #[command(subcommand)]
    Channels(ChannelCommand),
    /// Print the channel id behind a channel URL
    Resolve {
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(clap::Args, Debug)]
struct WindowArgs {
    /// Freshness window in hours (default from config)
    #[arg(long, value_name = "H")]
    hours: Option<f64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Subcommand, Debug)]
enum ChannelCommand {
    /// Track a channel by its page URL
    Add {
        #[arg(value_name = "URL")]
        url: String,
        /// Display name (default: the @handle in the URL)
        #[arg(long)]
        name: Option<String>,
    },
    /// List tracked channels
    List,
    /// Stop tracking a channel
    Remove {
        #[arg(value_name = "URL_OR_ID")]
        url_or_id: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics on stderr; stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.clone(), std::env::var_os("HOME"));
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            tracing::debug!("HOME not set and no --config given, using defaults");
            Config::default()
        }
    };

    let fetcher = HttpFetcher::with_user_agent(&config.user_agent)
        .context("Failed to build HTTP client")?
        .max_bytes(config.max_response_bytes);

    match args.command {
        Command::Feeds(window) => {
            let sources = config.feed_sources();
            if sources.is_empty() {
                let target = config_path
                    .as_deref()
                    .map_or_else(|| "a config file".to_string(), |p| p.display().to_string());
                eprintln!("No feeds configured. Add [[feeds]] entries to {target}");
            }
            run_window(&fetcher, &config, &sources, &FeedProfile::syndication(), &window).await
        }
        Command::Videos(window) => {
            let channels_path = channels_path()?;
            let list = ChannelList::load(&channels_path).with_context(|| {
                format!("Failed to load channels from {}", channels_path.display())
            })?;
            if list.channels.is_empty() {
                eprintln!("No channels tracked. Add one with: freshfeed channels add <URL>");
            }
            run_window(&fetcher, &config, &list.channels, &config.video_profile(), &window).await
        }
        Command::Channels(cmd) => {
            run_channels(&fetcher, &channels_path()?, config.fetch_timeout(), cmd).await
        }
        Command::Resolve { url } => {
            match channel::resolve_channel_id(&fetcher, &url, config.fetch_timeout()).await {
                Ok(id) => {
                    println!("{id}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn run_window(
    fetcher: &HttpFetcher,
    config: &Config,
    sources: &[Source],
    profile: &FeedProfile,
    window: &WindowArgs,
) -> Result<()> {
    let hours = window.hours.unwrap_or(config.window_hours);
    let cutoff = Cutoff::hours_ago(hours).context("Invalid --hours value")?;

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let report = aggregate_until(
        fetcher,
        sources,
        profile,
        cutoff,
        config.aggregate_options(),
        ctrl_c,
    )
    .await;

    print_entries(&report.entries, window.format)?;
    summarize_failures(&report);
    Ok(())
}

fn print_entries(entries: &[Entry], format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, entries).context("Failed to write JSON")?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for entry in entries {
                let when = entry
                    .published_at
                    .map(|at| at.to_rfc3339())
                    .or_else(|| entry.published_raw.clone())
                    .unwrap_or_default();
                let source = entry.source_name.as_deref().unwrap_or("-");
                writeln!(out, "{when}  [{source}] {}", entry.title)?;
                if !entry.link.is_empty() {
                    writeln!(out, "    {}", entry.link)?;
                }
            }
        }
    }
    Ok(())
}

fn summarize_failures(report: &AggregateReport) {
    if report.cancelled {
        eprintln!(
            "Interrupted: showing {} completed source(s)",
            report.outcomes.len()
        );
    }
    let failed = report.failed_count();
    if failed == 0 {
        return;
    }
    eprintln!("{failed} source(s) failed:");
    for outcome in report.failures() {
        if let Err(e) = &outcome.result {
            eprintln!("  {} ({}): {e}", outcome.source_name, outcome.feed_url);
        }
    }
}

async fn run_channels(
    fetcher: &HttpFetcher,
    channels_path: &Path,
    timeout: Duration,
    cmd: ChannelCommand,
) -> Result<()> {
    let mut list = ChannelList::load(channels_path)
        .with_context(|| format!("Failed to load channels from {}", channels_path.display()))?;

    match cmd {
        ChannelCommand::Add { url, name } => {
            let url = validate_url(url.trim())
                .with_context(|| format!("Invalid channel URL: {url}"))?
                .to_string();
            if list.contains_url(&url) {
                eprintln!("Channel already tracked: {url}");
                return Ok(());
            }

            let id = channel::resolve_channel_id(fetcher, &url, timeout)
                .await
                .with_context(|| format!("Failed to resolve channel id for {url}"))?;
            let name = name.unwrap_or_else(|| channel::channel_name_from_url(&url));

            match list.insert(Source::new(name.clone(), id.clone()).with_url(url)) {
                Ok(()) => {}
                Err(StoreError::Duplicate(url)) => {
                    eprintln!("Channel already tracked: {url}");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
            list.save(channels_path).context("Failed to save channel list")?;
            println!("Added {name} ({id})");
        }
        ChannelCommand::List => {
            for c in &list.channels {
                println!("{}\t{}\t{}", c.name, c.id, c.url.as_deref().unwrap_or(""));
            }
        }
        ChannelCommand::Remove { url_or_id } => {
            if list.remove(url_or_id.trim()) {
                list.save(channels_path).context("Failed to save channel list")?;
                println!("Removed {url_or_id}");
            } else {
                eprintln!("No tracked channel matches {url_or_id}");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_needs_no_home() {
        let explicit = PathBuf::from("feeds.toml");
        assert_eq!(resolve_config_path(Some(explicit.clone()), None), Some(explicit));
    }

    #[test]
    fn test_explicit_config_wins_over_home() {
        let explicit = PathBuf::from("/etc/freshfeed.toml");
        let home = Some(OsString::from("/home/reader"));
        assert_eq!(resolve_config_path(Some(explicit.clone()), home), Some(explicit));
    }

    #[test]
    fn test_default_config_under_home() {
        assert_eq!(
            resolve_config_path(None, Some(OsString::from("/home/reader"))),
            Some(PathBuf::from("/home/reader/.config/freshfeed/config.toml"))
        );
    }

    #[test]
    fn test_no_home_and_no_config_means_defaults() {
        assert_eq!(resolve_config_path(None, None), None);
        assert_eq!(resolve_config_path(None, Some(OsString::new())), None);
        assert_eq!(config_dir_in(None), None);
    }

    #[test]
    fn test_resolve_and_feeds_parse_with_explicit_config() {
        let args = Args::parse_from([
            "freshfeed",
            "--config",
            "x.toml",
            "resolve",
            "https://e.com/@a",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(args.command, Command::Resolve { .. }));

        let args = Args::parse_from(["freshfeed", "feeds", "--config", "x.toml"]);
        assert_eq!(resolve_config_path(args.config, None), Some(PathBuf::from("x.toml")));
    }
}
