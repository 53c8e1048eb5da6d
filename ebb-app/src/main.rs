//! `ebb`: prune aged posts from an account's timeline.
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;
use clap::Parser;
use ebb_common::EbbError;
use ebb_common::observability::{LogConfig, LogFormat, init_logging};
use ebb_config::{EbbConfig, EbbConfigLoader};
use ebb_http::OAuth1Token;
use ebb_prune::{PruneReport, prune};
use ebb_social::twitter::{TwitterApi, UserTimeline};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "ebb.yaml";

/// Prune posts older than the retention window from an account's history.
#[derive(Parser, Debug)]
#[command(name = "ebb", version, about)]
struct Cli {
    /// Config file. The default path may be absent; an explicit one must
    /// exist.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Walk and report without deleting anything.
    #[arg(long)]
    dry_run: bool,
    /// Print the run report as JSON instead of a summary line.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file).
    let config = load_config(cli.config.as_deref())?;

    // 2) Logging comes up before any API traffic.
    init_logging(log_config(&config))?;

    // 3) Resolve credentials and run a pass.
    let credentials = config
        .resolve_credentials()
        .map_err(|e| EbbError::Config(e.to_string()))?;
    let token = OAuth1Token::new(
        credentials.consumer_key,
        credentials.consumer_secret,
        credentials.access_token,
        credentials.access_token_secret,
    );
    let api = TwitterApi::new(token);
    let timeline = UserTimeline::new(&api, config.account.clone())
        .with_page_size(config.page_size)
        .with_retweets(config.include_retweets);

    let dry_run = cli.dry_run || config.dry_run;
    let window = Duration::days(i64::from(config.retention_days));
    let report = prune(&timeline, window, dry_run).await?;

    info!(
        event = "run.summary",
        account = %config.account,
        collected = report.collected,
        expired = report.expired,
        deleted = report.deleted,
        dry_run = report.dry_run,
        "run finished"
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_summary(&config.account, &report));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EbbConfig> {
    let loader = EbbConfigLoader::new();
    let config = match path {
        Some(path) => loader.with_file(path).load(),
        None => loader.with_file_if_present(DEFAULT_CONFIG_PATH).load(),
    }
    .map_err(|e| EbbError::Config(e.to_string()))?;
    Ok(config)
}

fn log_config(config: &EbbConfig) -> LogConfig {
    let mut log = LogConfig::default();
    if let Some(dir) = &config.log.dir {
        log.log_dir = Some(PathBuf::from(dir));
    }
    if let Some(format) = &config.log.format {
        log.format = match format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }
    if let Some(filter) = &config.log.filter {
        log.default_filter = filter.clone();
    }
    // A batch CLI should be visible while it runs; file-only logging is
    // something you opt into.
    log.emit_stderr = config.log.stderr.unwrap_or(true);
    log
}

fn render_summary(account: &str, report: &PruneReport) -> String {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    format!(
        "{prefix}{account}: collected {}, expired {}, deleted {} (cutoff {})",
        report.collected,
        report.expired,
        report.deleted,
        report.cutoff.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clap::CommandFactory;

    fn demo_report(dry_run: bool) -> PruneReport {
        PruneReport {
            collected: 450,
            expired: 3,
            deleted: if dry_run { 0 } else { 3 },
            cutoff: Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap(),
            dry_run,
        }
    }

    #[test]
    fn cli_definition_is_coherent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summary_line_reads_naturally() {
        let line = render_summary("whomever", &demo_report(false));
        assert_eq!(
            line,
            "whomever: collected 450, expired 3, deleted 3 (cutoff 2026-08-15T12:00:00+00:00)"
        );
    }

    #[test]
    fn dry_runs_are_labelled() {
        let line = render_summary("whomever", &demo_report(true));
        assert!(line.starts_with("[dry-run] "));
        assert!(line.contains("deleted 0"));
    }

    #[test]
    fn log_settings_map_onto_the_logging_config() {
        let config = EbbConfigLoader::new()
            .with_yaml_str(
                r#"
account: whomever
log:
  dir: /tmp/ebb-logs
  format: json
  stderr: true
  filter: debug
"#,
            )
            .load()
            .unwrap();

        let log = log_config(&config);
        assert_eq!(log.log_dir.as_deref(), Some(Path::new("/tmp/ebb-logs")));
        assert!(matches!(log.format, LogFormat::Json));
        assert!(log.emit_stderr);
        assert_eq!(log.default_filter, "debug");
    }

    #[test]
    fn stderr_stays_on_when_the_file_is_silent() {
        let config = EbbConfigLoader::new()
            .with_yaml_str("account: whomever")
            .load()
            .unwrap();
        assert!(log_config(&config).emit_stderr);

        let quiet = EbbConfigLoader::new()
            .with_yaml_str("account: whomever\nlog:\n  stderr: false")
            .load()
            .unwrap();
        assert!(!log_config(&quiet).emit_stderr);
    }
}
